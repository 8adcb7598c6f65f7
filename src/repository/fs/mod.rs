//! Content repository backed by a directory tree.
//!
//! Every revision is one XML document at a location derived from the
//! resource id; localized binary content sits next to it:
//!
//! ```text
//! <root>/<site>/repository/4bd6c1a2/0001/4a2b/9c3d/0123456789ab/
//! ├── index.xml      live
//! ├── work.xml       work
//! ├── 3.xml          revision 3
//! └── work_de.pdf    German content of the work version
//! ```
//!
//! Writers of one resource are serialized by a per-resource lock and only
//! ever replace files by rename. `index()` takes the repository write lock,
//! so readers wait for a reindex instead of seeing a partial index.

mod layout;
mod reindex;

pub use layout::{ROOT_ENV, ROOT_OPTION, RepositoryRoot};
pub use reindex::{IndexObserver, IndexReport};

use self::layout::Layout;
use super::index::{ContentRepositoryIndex, INDEX_VERSION, IndexError, RevisionInfo};
use super::lock::ResourceLocks;
use super::{ContentRepository, RepositoryError};
use crate::content::{Resource, ResourceUri, SerializerRegistry, Version};
use crate::language::{Language, LanguageRegistry};
use crate::site::Site;
use crate::url::{ResourcePath, UrlCodec};
use crate::utils::fs::{prune_empty_dirs, write_atomic, write_atomic_from};
use crate::utils::hash::{generate_identifier, is_valid_identifier};
use crate::{debug, log};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State of a connected repository.
struct Connection {
    site: String,
    layout: Layout,
    index: Mutex<ContentRepositoryIndex>,
}

impl Connection {
    /// Id from the uri, or the id indexed for its path.
    fn resolve_id(&self, uri: &ResourceUri) -> Option<String> {
        if let Some(id) = uri.id() {
            return Some(id.to_string());
        }
        let path = uri.path()?;
        self.index.lock().lookup_id(path).map(str::to_string)
    }

    /// Id of an indexed resource.
    fn indexed_id(&self, uri: &ResourceUri) -> Result<String, RepositoryError> {
        self.resolve_id(uri)
            .filter(|id| self.index.lock().contains(id))
            .ok_or_else(|| RepositoryError::NotIndexed(uri.to_string()))
    }
}

fn connected(state: &Option<Connection>) -> Result<&Connection, RepositoryError> {
    state.as_ref().ok_or(RepositoryError::NotConnected)
}

/// `FileSystemContentRepository` stores a site's resources below
/// `<root>/<site>/repository`.
pub struct FileSystemContentRepository {
    root: RepositoryRoot,
    serializers: Arc<SerializerRegistry>,
    codec: UrlCodec,
    state: RwLock<Option<Connection>>,
    locks: ResourceLocks,
    path_locks: ResourceLocks,
    rebuild_on_connect: bool,
    #[cfg(test)]
    fail_after: std::sync::atomic::AtomicUsize,
    #[cfg(test)]
    fail_swap: std::sync::atomic::AtomicBool,
}

impl FileSystemContentRepository {
    pub fn new(root: RepositoryRoot, serializers: Arc<SerializerRegistry>, codec: UrlCodec) -> Self {
        Self {
            root,
            serializers,
            codec,
            state: RwLock::new(None),
            locks: ResourceLocks::new(),
            path_locks: ResourceLocks::new(),
            rebuild_on_connect: true,
            #[cfg(test)]
            fail_after: std::sync::atomic::AtomicUsize::new(usize::MAX),
            #[cfg(test)]
            fail_swap: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Repository with the built-in serializers and the shared language registry.
    pub fn with_defaults(root: RepositoryRoot) -> Self {
        let languages = LanguageRegistry::shared();
        let serializers = Arc::new(SerializerRegistry::with_defaults(Arc::clone(&languages)));
        Self::new(root, serializers, UrlCodec::new(languages))
    }

    /// Whether `connect` rebuilds an empty or outdated index (default). Turn
    /// off when `index` runs right after connecting anyway.
    pub fn with_rebuild_on_connect(mut self, rebuild: bool) -> Self {
        self.rebuild_on_connect = rebuild;
        self
    }

    pub fn serializers(&self) -> &Arc<SerializerRegistry> {
        &self.serializers
    }

    /// `<root>/<site>/repository` while connected.
    pub fn repository_dir(&self) -> Option<PathBuf> {
        self.state.read().as_ref().map(|c| c.layout.repository())
    }

    pub fn resource_count(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map_or(0, |c| c.index.lock().resource_count())
    }

    pub fn revision_count(&self) -> usize {
        self.state
            .read()
            .as_ref()
            .map_or(0, |c| c.index.lock().revision_count())
    }

    /// Id of the resource at `path`.
    pub fn lookup_id(&self, path: &ResourcePath) -> Result<Option<String>, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        Ok(conn.index.lock().lookup_id(path).map(str::to_string))
    }

    // ========================================================================
    // Locations
    // ========================================================================

    /// Directory holding all revisions of the resource.
    ///
    /// `NotIndexed` when the index doesn't know the resource, `NotFound` when
    /// it does but the directory is missing.
    pub fn uri_to_directory(&self, uri: &ResourceUri) -> Result<PathBuf, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        let dir = conn.layout.resource_dir(&conn.indexed_id(uri)?);
        if !dir.is_dir() {
            return Err(RepositoryError::NotFound(uri.to_string()));
        }
        Ok(dir)
    }

    /// Document of the revision `uri` points at.
    pub fn uri_to_file(&self, uri: &ResourceUri) -> Result<PathBuf, RepositoryError> {
        let file = self
            .uri_to_directory(uri)?
            .join(uri.version().document_name());
        if !file.is_file() {
            return Err(RepositoryError::NotFound(uri.to_string()));
        }
        Ok(file)
    }

    /// Localized content files of `version` in `dir`.
    fn content_files(&self, dir: &Path, version: Version) -> io::Result<Vec<PathBuf>> {
        let selector = version.selector();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.')
                || Version::from_document_name(&name).is_some()
                || self.codec.extract_language(&name).is_none()
            {
                continue;
            }
            let base = self.codec.base_version(&name);
            if base.split('.').next() == Some(selector.as_str()) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Write a revision and index it. Returns the stored uri, id included.
    ///
    /// Resources without an id take the id indexed for their path, or a new one.
    pub fn store(&self, resource: &Resource) -> Result<ResourceUri, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        match resource.uri().path() {
            Some(path) => self
                .path_locks
                .with(path.as_str(), || self.store_locked(conn, resource)),
            None => self.store_locked(conn, resource),
        }
    }

    /// Runs with the path lock held, so no other writer claims the path
    /// between resolving the id and indexing the revision.
    fn store_locked(
        &self,
        conn: &Connection,
        resource: &Resource,
    ) -> Result<ResourceUri, RepositoryError> {
        let mut resource = resource.clone();
        let id = match conn.resolve_id(resource.uri()) {
            Some(id) => id,
            None => generate_identifier(resource.uri().path().map_or("", |p| p.as_str())),
        };
        if !is_valid_identifier(&id) {
            return Err(IndexError::InvalidId(id).into());
        }
        resource.uri_mut().set_id(id.clone());

        if let Some(path) = resource.uri().path()
            && let Some(owner) = conn.index.lock().lookup_id(path)
            && owner != id
        {
            return Err(IndexError::PathConflict {
                path: path.clone(),
                owner: owner.to_string(),
            }
            .into());
        }

        let resource_type = resource.uri().resource_type();
        let serializer = self
            .serializers
            .get(resource_type)
            .ok_or_else(|| RepositoryError::NoSerializer(resource_type.to_string()))?;
        let xml = serializer.write(&resource)?;

        self.locks.with(&id, || {
            let dir = conn.layout.resource_dir(&id);
            let file = dir.join(resource.uri().version().document_name());
            let previous = match fs::read(&file) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(RepositoryError::io(&file)(e)),
            };
            write_atomic(&file, xml.as_bytes()).map_err(RepositoryError::io(&file))?;

            if let Err(e) = conn.index.lock().replace(&resource) {
                // put the previous document back, or drop the orphan
                let undone = match &previous {
                    Some(bytes) => write_atomic(&file, bytes),
                    None => fs::remove_file(&file)
                        .and_then(|_| prune_empty_dirs(&dir, &conn.layout.repository())),
                };
                if let Err(undo) = undone {
                    log!("error"; "cannot restore {}: {}", file.display(), undo);
                }
                return Err(e.into());
            }
            debug!("repository"; "stored {}", resource.uri());
            Ok(resource.uri().clone())
        })
    }

    /// Delete the given versions (all versions when empty) of a resource,
    /// with their content files. Empty directories are removed up to the
    /// repository root.
    pub fn delete(&self, uri: &ResourceUri, versions: &[Version]) -> Result<(), RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        let id = conn.indexed_id(uri)?;

        self.locks.with(&id, || {
            let dir = conn.layout.resource_dir(&id);
            if !dir.is_dir() {
                return Err(RepositoryError::Io {
                    path: dir,
                    source: io::Error::new(io::ErrorKind::NotFound, "resource directory is missing"),
                });
            }

            let versions: Vec<Version> = if versions.is_empty() {
                conn.index.lock().versions(&id).into_iter().collect()
            } else {
                versions.to_vec()
            };
            for version in &versions {
                let mut files = self
                    .content_files(&dir, *version)
                    .map_err(RepositoryError::io(&dir))?;
                files.push(dir.join(version.document_name()));
                for file in files {
                    match fs::remove_file(&file) {
                        Err(e) if e.kind() != io::ErrorKind::NotFound => {
                            return Err(RepositoryError::io(&file)(e));
                        }
                        _ => {}
                    }
                }
            }

            conn.index.lock().remove(&id, &versions)?;
            prune_empty_dirs(&dir, &conn.layout.repository()).map_err(RepositoryError::io(&dir))?;
            debug!("repository"; "deleted {} ({} versions)", uri, versions.len());
            Ok(())
        })
    }

    /// Store localized binary content of a revision as `<version>_<lang>.<ext>`,
    /// replacing earlier content of that language. Returns the bytes written.
    pub fn store_content(
        &self,
        uri: &ResourceUri,
        language: &Language,
        filename: &str,
        data: impl Read,
    ) -> Result<u64, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        let id = conn.indexed_id(uri)?;
        self.locks.with(&id, || {
            self.store_content_locked(conn, &id, uri, language, filename, data)
        })
    }

    fn store_content_locked(
        &self,
        conn: &Connection,
        id: &str,
        uri: &ResourceUri,
        language: &Language,
        filename: &str,
        data: impl Read,
    ) -> Result<u64, RepositoryError> {
        let version = uri.version();
        let dir = conn.layout.resource_dir(id);
        let base = match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(extension) => format!("{}.{extension}", version.selector()),
            None => version.selector(),
        };
        let target = dir.join(self.codec.language_variant(&base, language));

        if dir.is_dir() {
            for existing in self
                .content_files(&dir, version)
                .map_err(RepositoryError::io(&dir))?
            {
                let name = existing.file_name().map(|n| n.to_string_lossy().into_owned());
                let same_language = name
                    .and_then(|n| self.codec.extract_language(&n))
                    .is_some_and(|l| l.as_ref() == language);
                if same_language && existing != target {
                    fs::remove_file(&existing).map_err(RepositoryError::io(&existing))?;
                }
            }
        }

        write_atomic_from(&target, data).map_err(RepositoryError::io(&target))
    }

    /// Open the content of a revision in `language`, if stored.
    pub fn open_content(
        &self,
        uri: &ResourceUri,
        language: &Language,
    ) -> Result<Option<File>, RepositoryError> {
        let dir = match self.uri_to_directory(uri) {
            Ok(dir) => dir,
            Err(RepositoryError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let files = self
            .content_files(&dir, uri.version())
            .map_err(RepositoryError::io(&dir))?;
        let found = files.into_iter().find(|file| {
            file.file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| self.codec.extract_language(n))
                .is_some_and(|l| l.as_ref() == language)
        });
        match found {
            Some(file) => File::open(&file)
                .map(Some)
                .map_err(RepositoryError::io(&file)),
            None => Ok(None),
        }
    }

    /// Give a resource a new path, in the index and in every revision document.
    pub fn move_resource(
        &self,
        uri: &ResourceUri,
        path: impl Into<ResourcePath>,
    ) -> Result<(), RepositoryError> {
        let path = path.into();
        let state = self.state.read();
        let conn = connected(&state)?;
        let id = conn.indexed_id(uri)?;
        self.path_locks.with(path.as_str(), || {
            self.locks
                .with(&id, || self.move_locked(conn, &id, path.clone()))
        })?;
        log!("repository"; "moved {} to {}", uri, path);
        Ok(())
    }

    fn move_locked(
        &self,
        conn: &Connection,
        id: &str,
        path: ResourcePath,
    ) -> Result<(), RepositoryError> {
        let (versions, resource_type) = {
            let index = conn.index.lock();
            if let Some(owner) = index.lookup_id(&path)
                && owner != id
            {
                return Err(IndexError::PathConflict {
                    path,
                    owner: owner.to_string(),
                }
                .into());
            }
            let resource_type = index.resource_type(id).unwrap_or_default().to_string();
            (index.versions(id), resource_type)
        };
        let serializer = self
            .serializers
            .get(&resource_type)
            .ok_or_else(|| RepositoryError::NoSerializer(resource_type.clone()))?;

        let dir = conn.layout.resource_dir(id);
        for version in versions {
            let file = dir.join(version.document_name());
            let xml = fs::read_to_string(&file).map_err(RepositoryError::io(&file))?;
            let mut resource = serializer.read(&xml, &conn.site)?;
            resource.uri_mut().set_id(id);
            resource.uri_mut().set_version(version);
            resource.uri_mut().set_path(path.clone());
            let xml = serializer.write(&resource)?;
            write_atomic(&file, xml.as_bytes()).map_err(RepositoryError::io(&file))?;
        }

        conn.index.lock().move_to(id, path)?;
        Ok(())
    }
}

impl ContentRepository for FileSystemContentRepository {
    fn site_identifier(&self) -> Option<String> {
        self.state.read().as_ref().map(|c| c.site.clone())
    }

    /// Open the site's index, rebuilding it from the tree when it is empty
    /// or was written by another index version.
    fn connect(&self, site: &Site) -> Result<(), RepositoryError> {
        let mut state = self.state.write();
        if let Some(conn) = state.as_ref() {
            return Err(RepositoryError::AlreadyConnected(conn.site.clone()));
        }

        let root = self.root.resolve(site);
        let layout = Layout::new(&root, site.identifier());
        let repository = layout.repository();
        fs::create_dir_all(&repository).map_err(RepositoryError::io(&repository))?;

        let index = ContentRepositoryIndex::open(layout.index())?;
        let stale = index.index_version() != Some(INDEX_VERSION) || index.resource_count() == 0;
        let mut conn = Connection {
            site: site.identifier().to_string(),
            layout,
            index: Mutex::new(index),
        };

        if stale && self.rebuild_on_connect {
            debug!("repository"; "rebuilding index of site {}", conn.site);
            let report = self.rebuild(&mut conn, &())?;
            debug!("repository"; "{}", report);
        }

        log!(
            "repository";
            "site {} connected at {} ({} resources)",
            conn.site,
            conn.layout.site_dir().display(),
            conn.index.lock().resource_count()
        );
        *state = Some(conn);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), RepositoryError> {
        let conn = self
            .state
            .write()
            .take()
            .ok_or(RepositoryError::NotConnected)?;
        conn.index.lock().flush()?;
        log!("repository"; "site {} disconnected", conn.site);
        Ok(())
    }

    fn get(&self, uri: &ResourceUri) -> Result<Option<Resource>, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        let Some(id) = conn.resolve_id(uri) else {
            return Ok(None);
        };
        let Some(resource_type) = conn.index.lock().resource_type(&id).map(str::to_string) else {
            return Ok(None);
        };

        let file = conn
            .layout
            .resource_dir(&id)
            .join(uri.version().document_name());
        let xml = match fs::read_to_string(&file) {
            Ok(xml) => xml,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::io(&file)(e)),
        };

        let serializer = self
            .serializers
            .get(&resource_type)
            .ok_or_else(|| RepositoryError::NoSerializer(resource_type.clone()))?;
        let mut resource = serializer.read(&xml, &conn.site)?;
        resource.uri_mut().set_id(id);
        resource.uri_mut().set_version(uri.version());
        Ok(Some(resource))
    }

    fn exists(&self, uri: &ResourceUri) -> Result<bool, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        Ok(conn
            .resolve_id(uri)
            .is_some_and(|id| conn.index.lock().exists(&id, uri.version())))
    }

    fn versions(&self, uri: &ResourceUri) -> Result<BTreeSet<Version>, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        Ok(conn
            .resolve_id(uri)
            .map(|id| conn.index.lock().versions(&id))
            .unwrap_or_default())
    }

    fn revision(&self, uri: &ResourceUri) -> Result<Option<RevisionInfo>, RepositoryError> {
        let state = self.state.read();
        let conn = connected(&state)?;
        Ok(conn
            .resolve_id(uri)
            .and_then(|id| conn.index.lock().revision(&id, uri.version()).cloned()))
    }
}

impl fmt::Debug for FileSystemContentRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemContentRepository")
            .field("root", &self.root)
            .field("site", &self.site_identifier())
            .finish_non_exhaustive()
    }
}
