//! System configuration management for `weblounge.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── repository # [repository]
//! │   └── site       # [[site]]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! └── mod.rs         # SystemConfig (this file)
//! ```
//!
//! # Example
//!
//! ```toml
//! environment = "production"   # production | staging | development
//!
//! [repository]
//! root = "sites-data"
//!
//! [[site]]
//! id = "demo"
//! hostnames = ["www.demo.org", "*.demo.org"]
//! languages = ["de", "en"]
//! ```

pub mod section;
pub mod types;
mod util;

use util::{find_config_file, resolve_dir};

pub use section::{HostnameEntry, RepositoryConfig, SiteEntry};
pub use types::{ConfigDiagnostic, ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::cli::Cli;
use crate::language::LanguageRegistry;
use crate::log;
use crate::repository::RepositoryRoot;
use crate::site::{Environment, HostPattern, Site, SiteError};
use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing weblounge.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory of the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Environment whose hostnames are bound.
    pub environment: Environment,

    pub repository: RepositoryConfig,

    #[serde(rename = "site")]
    pub sites: Vec<SiteEntry>,
}

impl SystemConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from the working directory. Commands that work without
    /// sites fall back to the defaults when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let Some(config_path) = find_config_file(&cwd, &cli.config) else {
            if cli.command.needs_config() {
                bail!(ConfigError::NotFound(cwd.join(&cli.config)));
            }
            return Ok(Self::default());
        };

        let mut config = Self::from_path(&config_path)?;
        config.finalize(&config_path);
        config.validate(&LanguageRegistry::shared())?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Record where the file lives and anchor relative paths there.
    fn finalize(&mut self, config_path: &Path) {
        self.config_path = crate::utils::fs::normalize_path(config_path);
        self.root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if let Some(root) = self.repository.root.take() {
            self.repository.root = Some(resolve_dir(&self.root, &root));
        }
    }

    // ========================================================================
    // accessors
    // ========================================================================

    pub fn site(&self, id: &str) -> Option<&SiteEntry> {
        self.sites.iter().find(|s| s.id == id)
    }

    /// Root directory resolution for the file system repositories, with an
    /// optional command line override.
    pub fn repository_root(&self, override_root: Option<&Path>) -> RepositoryRoot {
        let mut root = RepositoryRoot::new();
        if let Some(configured) = &self.repository.root {
            root = root.with_configured(configured);
        }
        if let Some(dir) = override_root {
            root = root.with_override(dir);
        }
        root
    }

    /// Build every configured site.
    pub fn build_sites(&self, registry: &LanguageRegistry) -> Result<Vec<Site>, SiteError> {
        self.sites.iter().map(|s| s.build(registry)).collect()
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate all sites, collecting every problem before failing.
    pub fn validate(&self, registry: &LanguageRegistry) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        let mut ids: FxHashMap<&str, usize> = FxHashMap::default();
        let mut bound: FxHashMap<(String, Environment), &str> = FxHashMap::default();

        for (index, site) in self.sites.iter().enumerate() {
            site.validate(index, registry, &mut diag);

            if let Some(first) = ids.insert(site.id.as_str(), index)
                && !site.id.is_empty()
            {
                diag.error(
                    FieldPath::site(index, "id"),
                    format!("site `{}` is already defined as site[{first}]", site.id),
                );
            }

            for hostname in &site.hostnames {
                let Ok(pattern) = HostPattern::parse(hostname.url()) else {
                    continue;
                };
                let key = (pattern.as_str().to_string(), hostname.environment());
                if let Some(owner) = bound.get(&key)
                    && *owner != site.id
                {
                    diag.error(
                        FieldPath::site(index, "hostnames"),
                        format!("hostname `{}` is already bound to site `{owner}`", key.0),
                    );
                    continue;
                }
                bound.insert(key, site.id.as_str());
            }
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SystemConfig {
    let (parsed, ignored) = SystemConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> std::sync::Arc<LanguageRegistry> {
        LanguageRegistry::shared()
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SystemConfig::from_str("[repository\nroot = \"x\"").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.environment, Environment::Production);
        assert!(config.sites.is_empty());
        assert_eq!(config.repository.root, None);
    }

    #[test]
    fn test_environment() {
        let config = test_parse_config("environment = \"staging\"");
        assert_eq!(config.environment, Environment::Staging);
        assert!(SystemConfig::from_str("environment = \"moon\"").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[repository]\nroot = \"x\"\nkind = \"jdbc\"\n[[site]]\nid = \"a\"\ncolour = 1";
        let (config, ignored) = SystemConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.sites[0].id, "a");
        assert!(ignored.iter().any(|f| f == "repository.kind"));
        assert!(ignored.iter().any(|f| f.contains("colour")));
    }

    #[test]
    fn test_validate_across_sites() {
        let config = test_parse_config(
            r#"
[[site]]
id = "a"
hostnames = ["www.a.com", { url = "www.a.com", environment = "staging" }]
languages = ["en"]

[[site]]
id = "b"
hostnames = ["WWW.A.COM"]
languages = ["en"]

[[site]]
id = "a"
hostnames = ["www.c.com"]
languages = ["en"]
"#,
        );
        let err = config.validate(&registry()).unwrap_err();
        let Some(ConfigError::Diagnostics(diag)) = err.downcast_ref::<ConfigError>() else {
            panic!("expected diagnostics, got {err}");
        };
        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["site[1].hostnames", "site[2].id"]);
    }

    #[test]
    fn test_valid_config_builds_sites() {
        let config = test_parse_config(
            r#"
[[site]]
id = "demo"
hostnames = ["demo.org"]
languages = ["en", "de"]
default_language = "de"
"#,
        );
        config.validate(&registry()).unwrap();
        let sites = config.build_sites(&registry()).unwrap();
        assert_eq!(sites.len(), 1);
        assert!(config.site("demo").is_some());
        assert!(config.site("other").is_none());
    }

    #[test]
    fn test_finalize_anchors_repository_root() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weblounge.toml");
        fs::write(&path, "[repository]\nroot = \"data\"").unwrap();

        let mut config = SystemConfig::from_path(&path).unwrap();
        config.finalize(&path);

        assert_eq!(config.root, crate::utils::fs::normalize_path(dir.path()));
        assert_eq!(config.repository.root, Some(config.root.join("data")));
    }

    #[test]
    fn test_repository_root_override() {
        let mut config = SystemConfig::default();
        config.repository.root = Some(PathBuf::from("/srv/data"));

        let root = config.repository_root(Some(Path::new("/tmp/override")));
        assert_eq!(root.overridden, Some(PathBuf::from("/tmp/override")));
        assert_eq!(root.configured, Some(PathBuf::from("/srv/data")));
        assert_eq!(config.repository_root(None).overridden, None);
    }
}
