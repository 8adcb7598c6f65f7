//! Content repositories.
//!
//! # Module Structure
//!
//! ```text
//! repository/
//! ├── index    # ContentRepositoryIndex: id / path / version tables
//! ├── lock     # per-resource write locks
//! ├── fs/      # FileSystemContentRepository
//! └── mod.rs   # ContentRepository trait, RepositoryError (this file)
//! ```

mod fs;
mod index;
mod lock;

pub use fs::{
    FileSystemContentRepository, IndexObserver, IndexReport, ROOT_ENV, ROOT_OPTION,
    RepositoryRoot,
};
pub use index::{ContentRepositoryIndex, INDEX_VERSION, IndexError, RevisionInfo, UriEntry};
pub use lock::ResourceLocks;

use crate::content::{Resource, ResourceUri, SerializerError, Version};
use crate::site::Site;
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository configuration: {0}")]
    Config(String),

    #[error("repository is not connected")]
    NotConnected,

    #[error("repository is already connected to site `{0}`")]
    AlreadyConnected(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} is not indexed")]
    NotIndexed(String),

    #[error("{0} not found in repository")]
    NotFound(String),

    #[error("no serializer for resource type `{0}`")]
    NoSerializer(String),

    #[error("cannot walk repository: {0}")]
    Walk(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Serializer(#[from] SerializerError),
}

impl RepositoryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Storage of a site's resources.
///
/// A repository serves at most one site at a time, between `connect` and
/// `disconnect`.
pub trait ContentRepository: Send + Sync + fmt::Debug {
    /// Site currently connected, if any.
    fn site_identifier(&self) -> Option<String>;

    fn connect(&self, site: &Site) -> Result<(), RepositoryError>;

    fn disconnect(&self) -> Result<(), RepositoryError>;

    fn is_connected(&self) -> bool {
        self.site_identifier().is_some()
    }

    /// Load one revision. `None` when it is not indexed or not on disk.
    fn get(&self, uri: &ResourceUri) -> Result<Option<Resource>, RepositoryError>;

    fn exists(&self, uri: &ResourceUri) -> Result<bool, RepositoryError>;

    /// Indexed versions of the resource, sorted.
    fn versions(&self, uri: &ResourceUri) -> Result<BTreeSet<Version>, RepositoryError>;

    /// Language metadata of one revision, from the index.
    fn revision(&self, uri: &ResourceUri) -> Result<Option<RevisionInfo>, RepositoryError>;
}
