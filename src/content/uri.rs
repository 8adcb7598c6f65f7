//! Resource identity.

use super::Version;
use crate::url::ResourcePath;
use std::fmt;

/// Well-known resource types.
pub mod types {
    pub const PAGE: &str = "page";
    pub const FILE: &str = "file";
    pub const IMAGE: &str = "image";
}

/// Identity of one resource revision inside a site.
///
/// Either `path` or `id` locates the resource; the id may be missing until
/// it is looked up in the index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri {
    site: String,
    resource_type: String,
    path: Option<ResourcePath>,
    id: Option<String>,
    version: Version,
}

impl ResourceUri {
    /// Live version of a resource that has neither path nor id yet.
    pub fn new(site: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            resource_type: resource_type.into(),
            path: None,
            id: None,
            version: Version::Live,
        }
    }

    pub fn with_path(mut self, path: impl Into<ResourcePath>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn path(&self) -> Option<&ResourcePath> {
        self.path.as_ref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn set_path(&mut self, path: impl Into<ResourcePath>) {
        self.path = Some(path.into());
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn set_resource_type(&mut self, resource_type: impl Into<String>) {
        self.resource_type = resource_type.into();
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locator = match (&self.id, &self.path) {
            (Some(id), _) => id.as_str(),
            (None, Some(path)) => path.as_str(),
            (None, None) => "?",
        };
        write!(
            f,
            "{}:{}:{}@{}",
            self.site, self.resource_type, locator, self.version
        )
    }
}
