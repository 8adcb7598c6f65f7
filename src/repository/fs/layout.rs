//! Where a site's repository lives on disk.

use crate::site::Site;
use crate::utils::fs::expand_path;
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable overriding every other root setting.
pub const ROOT_ENV: &str = "WEBLOUNGE_SITES_DATA";

/// Site option naming the repository root.
pub const ROOT_OPTION: &str = "contentrepository.fs.root";

const REPOSITORY_DIR: &str = "repository";
const INDEX_DIR: &str = "index";
const STAGING_DIR: &str = ".repository";

/// Root directory settings, lowest to highest precedence:
/// `<temp>/sites-data`, `configured`, the site option, `overridden`, `ROOT_ENV`.
#[derive(Debug, Clone, Default)]
pub struct RepositoryRoot {
    /// From the command line.
    pub overridden: Option<PathBuf>,
    /// From the `[repository]` configuration section.
    pub configured: Option<PathBuf>,
}

impl RepositoryRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, root: impl Into<PathBuf>) -> Self {
        self.overridden = Some(root.into());
        self
    }

    pub fn with_configured(mut self, root: impl Into<PathBuf>) -> Self {
        self.configured = Some(root.into());
        self
    }

    /// Root directory holding all site directories for `site`.
    pub fn resolve(&self, site: &Site) -> PathBuf {
        if let Ok(root) = env::var(ROOT_ENV)
            && !root.trim().is_empty()
        {
            return expand_path(&root);
        }
        if let Some(root) = &self.overridden {
            return root.clone();
        }
        if let Some(root) = site.options().value(ROOT_OPTION) {
            return expand_path(root);
        }
        match &self.configured {
            Some(root) => root.clone(),
            None => env::temp_dir().join("sites-data"),
        }
    }
}

/// Directory layout of one site:
///
/// ```text
/// <root>/<site>/repository/<a>/<b>/<c>/<d>/<e>/<version>.xml
/// <root>/<site>/index/{uri,path,version}.idx
/// ```
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    site_dir: PathBuf,
}

impl Layout {
    pub fn new(root: &Path, site: &str) -> Self {
        Self {
            site_dir: root.join(site),
        }
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    pub fn repository(&self) -> PathBuf {
        self.site_dir.join(REPOSITORY_DIR)
    }

    pub fn index(&self) -> PathBuf {
        self.site_dir.join(INDEX_DIR)
    }

    pub fn staging(&self) -> PathBuf {
        self.site_dir.join(STAGING_DIR)
    }

    pub fn index_sibling(&self, kind: &str, tag: &str) -> PathBuf {
        self.site_dir.join(format!("{INDEX_DIR}-{kind}-{tag}"))
    }

    /// Directory of resource `id` below `base`: one level per `-` separated part.
    pub fn resource_dir_in(base: &Path, id: &str) -> PathBuf {
        let mut dir = base.to_path_buf();
        for part in id.split('-').filter(|p| !p.is_empty()) {
            dir.push(part);
        }
        dir
    }

    pub fn resource_dir(&self, id: &str) -> PathBuf {
        Self::resource_dir_in(&self.repository(), id)
    }
}
