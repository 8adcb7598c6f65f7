//! Content repository index.
//!
//! Three tables, each persisted as its own JSON file in the index directory:
//!
//! | File          | Maps                                        |
//! |---------------|---------------------------------------------|
//! | `uri.idx`     | id -> {type, path}                          |
//! | `path.idx`    | path -> id                                  |
//! | `version.idx` | id -> {version -> {languages, original}}    |
//!
//! Every file carries `INDEX_VERSION`. A missing, unreadable or differently
//! versioned file leaves the index empty and `index_version()` at `None`,
//! which tells the repository to rebuild.

use crate::content::{Resource, Version};
use crate::debug;
use crate::url::ResourcePath;
use crate::utils::fs::write_atomic;
use crate::utils::hash::{generate_identifier, is_valid_identifier};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// On-disk format version of the index files.
pub const INDEX_VERSION: u32 = 1;

const URI_INDEX: &str = "uri.idx";
const PATH_INDEX: &str = "path.idx";
const VERSION_INDEX: &str = "version.idx";

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode index: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("resource {id} is already indexed at version {version}")]
    Duplicate { id: String, version: Version },

    #[error("path {path} already belongs to resource {owner}")]
    PathConflict { path: ResourcePath, owner: String },

    #[error("resource {0} is not indexed")]
    Unknown(String),

    #[error("`{0}` is not a valid resource identifier")]
    InvalidId(String),
}

/// `uri.idx` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriEntry {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<ResourcePath>,
}

/// `version.idx` entry: what one revision contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInfo {
    /// Language identifiers with content in this revision.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Identifier of the original language, if flagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
}

impl RevisionInfo {
    fn of(resource: &Resource) -> Self {
        Self {
            languages: resource
                .contents()
                .iter()
                .map(|c| c.language().identifier().to_string())
                .collect(),
            original: resource
                .original_language()
                .map(|l| l.identifier().to_string()),
        }
    }

    pub fn supports(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

#[derive(Serialize, Deserialize)]
struct IndexFile<T> {
    version: u32,
    entries: T,
}

/// Id / path / version lookup tables of one site repository.
#[derive(Debug)]
pub struct ContentRepositoryIndex {
    dir: PathBuf,
    uris: BTreeMap<String, UriEntry>,
    paths: BTreeMap<ResourcePath, String>,
    versions: BTreeMap<String, BTreeMap<Version, RevisionInfo>>,
    loaded_version: Option<u32>,
    autoflush: bool,
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> IndexError + '_ {
    move |source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Entries of one index file, or `None` when absent, corrupt or outdated.
fn load_table<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let json = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<IndexFile<T>>(&json) {
        Ok(file) if file.version == INDEX_VERSION => Some(file.entries),
        Ok(file) => {
            debug!("index"; "{} has version {}, expected {}", path.display(), file.version, INDEX_VERSION);
            None
        }
        Err(e) => {
            debug!("index"; "{} is unreadable: {}", path.display(), e);
            None
        }
    }
}

impl ContentRepositoryIndex {
    /// Open the index stored in `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let mut index = Self {
            uris: BTreeMap::new(),
            paths: BTreeMap::new(),
            versions: BTreeMap::new(),
            loaded_version: None,
            autoflush: true,
            dir,
        };

        let uris = load_table(&index.dir.join(URI_INDEX));
        let paths = load_table(&index.dir.join(PATH_INDEX));
        let versions = load_table(&index.dir.join(VERSION_INDEX));
        if let (Some(uris), Some(paths), Some(versions)) = (uris, paths, versions) {
            index.uris = uris;
            index.paths = paths;
            index.versions = versions;
            index.loaded_version = Some(INDEX_VERSION);
        }
        Ok(index)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Point the index at another directory, e.g. after it was renamed.
    pub fn relocate(&mut self, dir: impl Into<PathBuf>) {
        self.dir = dir.into();
    }

    /// Format version found on disk; `None` when the files were missing,
    /// unreadable or of another version.
    pub fn index_version(&self) -> Option<u32> {
        self.loaded_version
    }

    /// Write every change to disk immediately (default) or only on `flush`.
    pub fn set_autoflush(&mut self, autoflush: bool) {
        self.autoflush = autoflush;
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Index one revision and return its resource id.
    ///
    /// Resources without an id reuse the id owning their path, or get a new
    /// one. Adding the live version (or the first version) sets the path.
    pub fn add(&mut self, resource: &Resource) -> Result<String, IndexError> {
        self.commit(|index| index.insert(resource))
    }

    /// Like `add`, replacing the revision if it is already indexed.
    pub fn replace(&mut self, resource: &Resource) -> Result<String, IndexError> {
        self.commit(|index| {
            let id = index.claim(resource)?;
            index.drop_versions(&id, &[resource.uri().version()]);
            index.insert(resource)
        })
    }

    /// Id `resource` is indexed under, checked against the path table.
    fn claim(&self, resource: &Resource) -> Result<String, IndexError> {
        let uri = resource.uri();
        let path = uri.path();
        let id = match uri.id() {
            Some(id) => id.to_string(),
            None => match path.and_then(|p| self.paths.get(p)) {
                Some(owner) => owner.clone(),
                None => generate_identifier(path.map_or("", |p| p.as_str())),
            },
        };
        if !is_valid_identifier(&id) {
            return Err(IndexError::InvalidId(id));
        }
        if let Some(path) = path
            && let Some(owner) = self.paths.get(path)
            && *owner != id
        {
            return Err(IndexError::PathConflict {
                path: path.clone(),
                owner: owner.clone(),
            });
        }
        Ok(id)
    }

    fn insert(&mut self, resource: &Resource) -> Result<String, IndexError> {
        let id = self.claim(resource)?;
        let uri = resource.uri();
        let version = uri.version();
        if self.exists(&id, version) {
            return Err(IndexError::Duplicate { id, version });
        }

        let entry = self.uris.entry(id.clone()).or_insert_with(|| UriEntry {
            resource_type: uri.resource_type().to_string(),
            path: None,
        });
        if let Some(path) = uri.path().cloned()
            && (entry.path.is_none() || version == Version::Live)
            && entry.path.as_ref() != Some(&path)
        {
            if let Some(old) = entry.path.replace(path.clone()) {
                self.paths.remove(&old);
            }
            self.paths.insert(path, id.clone());
        }

        self.versions
            .entry(id.clone())
            .or_default()
            .insert(version, RevisionInfo::of(resource));
        Ok(id)
    }

    /// Remove the given versions of a resource, or all of them when
    /// `versions` is empty. The resource disappears with its last version.
    ///
    /// Returns `false` when nothing was indexed under `id`.
    pub fn remove(&mut self, id: &str, versions: &[Version]) -> Result<bool, IndexError> {
        if !self.versions.contains_key(id) {
            return Ok(false);
        }
        self.commit(|index| {
            index.drop_versions(id, versions);
            Ok(true)
        })
    }

    fn drop_versions(&mut self, id: &str, versions: &[Version]) {
        let Some(revisions) = self.versions.get_mut(id) else {
            return;
        };
        if versions.is_empty() {
            revisions.clear();
        } else {
            for version in versions {
                revisions.remove(version);
            }
        }

        if revisions.is_empty() {
            self.versions.remove(id);
            if let Some(entry) = self.uris.remove(id)
                && let Some(path) = entry.path
            {
                self.paths.remove(&path);
            }
        }
    }

    /// Give a resource a new path.
    pub fn move_to(&mut self, id: &str, path: ResourcePath) -> Result<(), IndexError> {
        self.commit(|index| {
            if let Some(owner) = index.paths.get(&path)
                && owner != id
            {
                return Err(IndexError::PathConflict {
                    path,
                    owner: owner.clone(),
                });
            }
            let entry = index
                .uris
                .get_mut(id)
                .ok_or_else(|| IndexError::Unknown(id.to_string()))?;
            if let Some(old) = entry.path.replace(path.clone()) {
                index.paths.remove(&old);
            }
            index.paths.insert(path, id.to_string());
            Ok(())
        })
    }

    /// Forget everything. Lookups miss until resources are added again.
    pub fn clear(&mut self) -> Result<(), IndexError> {
        self.commit(|index| {
            index.uris.clear();
            index.paths.clear();
            index.versions.clear();
            Ok(())
        })
    }

    /// Apply `change`, then flush when autoflush is on. Changes check
    /// everything before they mutate, so only a failed flush needs the
    /// tables put back.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Self) -> Result<T, IndexError>,
    ) -> Result<T, IndexError> {
        if !self.autoflush {
            return change(self);
        }
        let saved = (
            self.uris.clone(),
            self.paths.clone(),
            self.versions.clone(),
        );
        let value = change(self)?;
        if let Err(e) = self.flush() {
            (self.uris, self.paths, self.versions) = saved;
            return Err(e);
        }
        Ok(value)
    }

    /// Write all three tables.
    pub fn flush(&mut self) -> Result<(), IndexError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        self.write_table(URI_INDEX, &self.uris)?;
        self.write_table(PATH_INDEX, &self.paths)?;
        self.write_table(VERSION_INDEX, &self.versions)?;
        self.loaded_version = Some(INDEX_VERSION);
        Ok(())
    }

    fn write_table<T: Serialize>(&self, name: &str, entries: &T) -> Result<(), IndexError> {
        let path = self.dir.join(name);
        let json = serde_json::to_vec(&IndexFile {
            version: INDEX_VERSION,
            entries,
        })?;
        write_atomic(&path, &json).map_err(io_error(&path))
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Id of the resource at `path`.
    pub fn lookup_id(&self, path: &ResourcePath) -> Option<&str> {
        self.paths.get(path).map(String::as_str)
    }

    /// Path of resource `id`.
    pub fn lookup_path(&self, id: &str) -> Option<&ResourcePath> {
        self.uris.get(id)?.path.as_ref()
    }

    pub fn resource_type(&self, id: &str) -> Option<&str> {
        self.uris.get(id).map(|e| e.resource_type.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.uris.contains_key(id)
    }

    pub fn exists(&self, id: &str, version: Version) -> bool {
        self.versions
            .get(id)
            .is_some_and(|v| v.contains_key(&version))
    }

    /// Indexed versions of `id`, sorted; empty when unknown.
    pub fn versions(&self, id: &str) -> BTreeSet<Version> {
        self.versions
            .get(id)
            .map(|v| v.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Language metadata of one revision.
    pub fn revision(&self, id: &str, version: Version) -> Option<&RevisionInfo> {
        self.versions.get(id)?.get(&version)
    }

    /// Indexed resource ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.uris.keys().map(String::as_str)
    }

    pub fn resource_count(&self) -> usize {
        self.uris.len()
    }

    pub fn revision_count(&self) -> usize {
        self.versions.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{LocalizedContent, ResourceUri, types};
    use crate::language::LanguageRegistry;
    use tempfile::TempDir;

    const ID: &str = "4bd6c1a2-0001-4a2b-9c3d-0123456789ab";

    fn page(id: Option<&str>, path: &str, version: Version) -> Resource {
        let mut uri = ResourceUri::new("demo", types::PAGE)
            .with_path(path)
            .with_version(version);
        if let Some(id) = id {
            uri.set_id(id);
        }
        let languages = LanguageRegistry::shared();
        Resource::new(uri)
            .with_content(
                LocalizedContent::new(languages.resolve("de").unwrap()).with_original(true),
            )
            .with_content(LocalizedContent::new(languages.resolve("en").unwrap()))
    }

    #[test]
    fn test_add_is_visible_immediately() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        assert_eq!(index.index_version(), None);

        let id = index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
        assert_eq!(id, ID);
        assert_eq!(index.lookup_id(&"/about/".into()), Some(ID));
        assert_eq!(index.lookup_path(ID).map(|p| p.as_str()), Some("/about/"));
        assert_eq!(index.resource_type(ID), Some("page"));
        assert!(index.exists(ID, Version::Live));
        assert!(!index.exists(ID, Version::Work));

        let revision = index.revision(ID, Version::Live).unwrap();
        assert_eq!(revision.languages, vec!["de", "en"]);
        assert_eq!(revision.original.as_deref(), Some("de"));
        assert!(revision.supports("en"));
    }

    #[test]
    fn test_versions_are_sorted() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        for version in [
            Version::Revision(3),
            Version::Work,
            Version::Live,
            Version::Revision(1),
        ] {
            index.add(&page(Some(ID), "/about", version)).unwrap();
        }
        let versions: Vec<_> = index.versions(ID).into_iter().collect();
        assert_eq!(
            versions,
            vec![
                Version::Live,
                Version::Work,
                Version::Revision(1),
                Version::Revision(3)
            ]
        );
        assert_eq!(index.resource_count(), 1);
        assert_eq!(index.revision_count(), 4);
        assert!(index.versions("unknown").is_empty());
    }

    #[test]
    fn test_add_without_id_reuses_path_owner() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        let generated = index.add(&page(None, "/news", Version::Live)).unwrap();
        assert_eq!(generated.len(), 36);

        let again = index.add(&page(None, "/news", Version::Work)).unwrap();
        assert_eq!(again, generated);
        assert_eq!(index.revision_count(), 2);
    }

    #[test]
    fn test_duplicate_and_conflict() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        index.add(&page(Some(ID), "/about", Version::Live)).unwrap();

        assert!(matches!(
            index.add(&page(Some(ID), "/about", Version::Live)),
            Err(IndexError::Duplicate { .. })
        ));
        assert!(matches!(
            index.add(&page(Some("other"), "/about", Version::Live)),
            Err(IndexError::PathConflict { .. })
        ));
        assert_eq!(index.revision_count(), 1);
    }

    #[test]
    fn test_remove_versions_then_resource() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
        index.add(&page(Some(ID), "/about", Version::Work)).unwrap();

        assert!(index.remove(ID, &[Version::Work]).unwrap());
        assert_eq!(index.versions(ID).len(), 1);
        assert!(index.contains(ID));

        assert!(index.remove(ID, &[Version::Live]).unwrap());
        assert!(!index.contains(ID));
        assert_eq!(index.lookup_id(&"/about".into()), None);
        assert!(!index.remove(ID, &[]).unwrap());
    }

    #[test]
    fn test_move_to() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
        index.add(&page(Some("other"), "/contact", Version::Live)).unwrap();

        index.move_to(ID, "/company/about".into()).unwrap();
        assert_eq!(index.lookup_id(&"/about".into()), None);
        assert_eq!(index.lookup_id(&"/company/about".into()), Some(ID));

        assert!(matches!(
            index.move_to(ID, "/contact".into()),
            Err(IndexError::PathConflict { .. })
        ));
        assert!(matches!(
            index.move_to("missing", "/x".into()),
            Err(IndexError::Unknown(_))
        ));
    }

    #[test]
    fn test_clear_makes_lookups_miss() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
        index.clear().unwrap();

        assert_eq!(index.resource_count(), 0);
        assert_eq!(index.lookup_id(&"/about".into()), None);
        assert!(index.versions(ID).is_empty());
    }

    #[test]
    fn test_reopen_restores_tables() {
        let dir = TempDir::new().unwrap();
        {
            let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
            index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
            index.add(&page(Some(ID), "/about", Version::Revision(2))).unwrap();
        }
        let index = ContentRepositoryIndex::open(dir.path()).unwrap();
        assert_eq!(index.index_version(), Some(INDEX_VERSION));
        assert_eq!(index.lookup_id(&"/about".into()), Some(ID));
        assert_eq!(index.versions(ID).len(), 2);
    }

    #[test]
    fn test_deferred_flush() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        index.set_autoflush(false);
        index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
        assert!(!dir.path().join(URI_INDEX).exists());

        index.flush().unwrap();
        assert!(dir.path().join(URI_INDEX).exists());
    }

    #[test]
    fn test_version_mismatch_is_reported() {
        let dir = TempDir::new().unwrap();
        {
            let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
            index.add(&page(Some(ID), "/about", Version::Live)).unwrap();
        }
        fs::write(
            dir.path().join(PATH_INDEX),
            r#"{"version": 0, "entries": {}}"#,
        )
        .unwrap();

        let index = ContentRepositoryIndex::open(dir.path()).unwrap();
        assert_eq!(index.index_version(), None);
        assert_eq!(index.resource_count(), 0);

        fs::write(dir.path().join(URI_INDEX), "not json").unwrap();
        let index = ContentRepositoryIndex::open(dir.path()).unwrap();
        assert_eq!(index.index_version(), None);
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        for id in ["../escaped", "/tmp/escaped", "a--b"] {
            assert!(matches!(
                index.add(&page(Some(id), "/about", Version::Live)),
                Err(IndexError::InvalidId(_))
            ));
        }
        assert_eq!(index.resource_count(), 0);
        assert_eq!(index.lookup_id(&"/about".into()), None);
    }

    #[test]
    fn test_failed_flush_keeps_previous_tables() {
        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("index");
        let mut index = ContentRepositoryIndex::open(&index_dir).unwrap();
        index.add(&page(Some(ID), "/about", Version::Live)).unwrap();

        // a plain file where the directory was makes every flush fail
        fs::remove_dir_all(&index_dir).unwrap();
        fs::write(&index_dir, "").unwrap();

        assert!(matches!(
            index.add(&page(Some("other"), "/contact", Version::Live)),
            Err(IndexError::Io { .. })
        ));
        assert!(!index.contains("other"));
        assert_eq!(index.lookup_id(&"/contact".into()), None);

        assert!(index.remove(ID, &[]).is_err());
        assert!(index.exists(ID, Version::Live));
        assert_eq!(index.lookup_id(&"/about".into()), Some(ID));

        assert!(index.move_to(ID, "/moved".into()).is_err());
        assert_eq!(index.lookup_path(ID).map(|p| p.as_str()), Some("/about/"));
    }

    #[test]
    fn test_replace_existing_revision() {
        let dir = TempDir::new().unwrap();
        let mut index = ContentRepositoryIndex::open(dir.path()).unwrap();
        index.add(&page(Some(ID), "/about", Version::Work)).unwrap();

        let languages = LanguageRegistry::shared();
        let mut uri = ResourceUri::new("demo", types::PAGE)
            .with_path("/about")
            .with_version(Version::Work);
        uri.set_id(ID);
        let french = Resource::new(uri)
            .with_content(LocalizedContent::new(languages.resolve("fr").unwrap()));
        index.replace(&french).unwrap();

        let revision = index.revision(ID, Version::Work).unwrap();
        assert_eq!(revision.languages, vec!["fr"]);
        assert_eq!(index.revision_count(), 1);
    }
}
