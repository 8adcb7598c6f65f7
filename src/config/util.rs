//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find the config file by searching upward from `start`.
///
/// ```text
/// /srv/cms/sites/demo/   ← start
/// /srv/cms/weblounge.toml ← found
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.is_file().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Resolve a configured directory: `~` is expanded, relative paths are
/// taken relative to `base`.
pub fn resolve_dir(base: &Path, raw: &Path) -> PathBuf {
    let expanded = crate::utils::fs::expand_path(&raw.to_string_lossy());
    if expanded.is_relative() {
        base.join(expanded)
    } else {
        expanded
    }
}

// ============================================================================
// tests
// ============================================================================
