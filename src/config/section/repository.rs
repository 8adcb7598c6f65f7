//! `[repository]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [repository]
//! root = "~/weblounge/sites-data"   # relative paths start at the config file
//! ```
//!
//! The `WEBLOUNGE_SITES_DATA` environment variable, the `--root` flag and the
//! `contentrepository.fs.root` site option take precedence, in that order.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Directory holding one subdirectory per site.
    pub root: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::path::PathBuf;

    #[test]
    fn test_repository_root() {
        let config = test_parse_config("[repository]\nroot = \"/srv/data\"");
        assert_eq!(config.repository.root, Some(PathBuf::from("/srv/data")));
    }

    #[test]
    fn test_repository_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.repository.root, None);
    }
}
