//! Rebuilding a site index from the repository tree.
//!
//! ```text
//! walk repository/ ──► parse (parallel) ──► index-new-<tag>/ + .repository/
//!                                                │
//!                      restructured? ◄───────────┘
//!                 yes: repository/ -> repository-old, .repository/ -> repository/
//!                 no:  drop .repository/
//!                      index/ -> index-old-<tag>, index-new-<tag>/ -> index/
//! ```
//!
//! Nothing outside the staging directories changes until the walk finished.

use super::layout::Layout;
use super::{Connection, FileSystemContentRepository};
use crate::content::{Resource, Version, sniff_resource_type};
use crate::repository::RepositoryError;
use crate::repository::index::{ContentRepositoryIndex, IndexError};
use crate::utils::fs::{copy_file, remove_tree, unused_sibling, write_atomic};
use crate::utils::hash::{fingerprint, generate_identifier};
use crate::{debug, log};
use jwalk::WalkDir;
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub resources: usize,
    pub revisions: usize,
    /// Documents that were unreadable, had no serializer or clashed.
    pub skipped: usize,
    /// Whether documents were moved to their canonical location.
    pub restructured: bool,
}

impl fmt::Display for IndexReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resources, {} revisions, {} skipped",
            self.resources, self.revisions, self.skipped
        )?;
        if self.restructured {
            f.write_str(", restructured")?;
        }
        Ok(())
    }
}

/// Progress callbacks of a reindex.
pub trait IndexObserver: Sync {
    /// Number of revision documents found by the walk.
    fn walked(&self, _documents: usize) {}

    /// One document was indexed (`true`) or skipped (`false`).
    fn processed(&self, _document: &Path, _indexed: bool) {}
}

impl IndexObserver for () {}

/// Revision documents below `repository`, sorted.
fn collect_documents(repository: &Path) -> Result<Vec<PathBuf>, RepositoryError> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(repository).sort(true) {
        let entry = entry.map_err(|e| RepositoryError::Walk(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.starts_with('.') && Version::from_document_name(&name).is_some() {
            documents.push(entry.path());
        }
    }
    documents.sort();
    Ok(documents)
}

impl FileSystemContentRepository {
    /// Rebuild the index of the connected site from its repository tree.
    pub fn index(&self) -> Result<IndexReport, RepositoryError> {
        self.index_with(&())
    }

    /// `index` with progress reporting.
    pub fn index_with(&self, observer: &dyn IndexObserver) -> Result<IndexReport, RepositoryError> {
        let mut state = self.state.write();
        let conn = state.as_mut().ok_or(RepositoryError::NotConnected)?;
        let report = self.rebuild(conn, observer)?;
        log!("index"; "site {}: {}", conn.site, report);
        Ok(report)
    }

    /// Runs with the repository write lock held.
    pub(super) fn rebuild(
        &self,
        conn: &mut Connection,
        observer: &dyn IndexObserver,
    ) -> Result<IndexReport, RepositoryError> {
        let layout = conn.layout.clone();
        let tag = fingerprint(&generate_identifier(&conn.site));
        let staging = layout.staging();
        let new_index = layout.index_sibling("new", &tag);

        let built = remove_tree(&staging)
            .map_err(RepositoryError::io(&staging))
            .and_then(|_| self.build(conn, &layout, &new_index, observer));
        let (mut index, report) = match built {
            Ok(built) => built,
            Err(e) => {
                let _ = remove_tree(&staging);
                let _ = remove_tree(&new_index);
                log!("error"; "reindex of site {} failed, keeping previous index: {}", conn.site, e);
                return Err(e);
            }
        };

        let repository = layout.repository();
        let repository_aside = unused_sibling(&repository);
        if report.restructured {
            swap_dirs(&staging, &repository, &repository_aside).inspect_err(|_| {
                let _ = remove_tree(&staging);
                let _ = remove_tree(&new_index);
            })?;
        } else {
            remove_tree(&staging).map_err(RepositoryError::io(&staging))?;
        }

        let current = layout.index();
        let old = layout.index_sibling("old", &tag);
        if let Err(e) = self.swap_index(&new_index, &current, &old) {
            let _ = remove_tree(&new_index);
            if report.restructured {
                // back to the tree the live index describes
                let restored = fs::rename(&repository, &staging)
                    .and_then(|_| fs::rename(&repository_aside, &repository));
                match restored {
                    Ok(()) => {
                        let _ = remove_tree(&staging);
                    }
                    Err(undo) => {
                        log!("error"; "cannot restore {}: {}", repository.display(), undo);
                    }
                }
            }
            log!("error"; "reindex of site {} failed, keeping previous index: {}", conn.site, e);
            return Err(e);
        }
        if report.restructured {
            log!("repository"; "site {}: documents moved to their canonical location", conn.site);
        }
        if let Err(e) = remove_tree(&old) {
            log!("warning"; "cannot remove {}: {}", old.display(), e);
        }

        index.relocate(current);
        index.set_autoflush(true);
        *conn.index.get_mut() = index;
        Ok(report)
    }

    fn swap_index(
        &self,
        new_index: &Path,
        current: &Path,
        old: &Path,
    ) -> Result<(), RepositoryError> {
        #[cfg(test)]
        if self.fail_swap.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(RepositoryError::Io {
                path: new_index.to_path_buf(),
                source: std::io::Error::other("injected failure"),
            });
        }
        swap_dirs(new_index, current, old)
    }

    /// Walk, parse and stage every document. Touches only the staging tree
    /// and the new index directory.
    fn build(
        &self,
        conn: &Connection,
        layout: &Layout,
        index_dir: &Path,
        observer: &dyn IndexObserver,
    ) -> Result<(ContentRepositoryIndex, IndexReport), RepositoryError> {
        let staging = layout.staging();
        let documents = collect_documents(&layout.repository())?;
        observer.walked(documents.len());

        let parsed: Vec<(PathBuf, Option<Resource>)> = documents
            .into_par_iter()
            .map(|path| {
                let resource = self.read_document(&path, &conn.site);
                (path, resource)
            })
            .collect();

        remove_tree(index_dir).map_err(RepositoryError::io(index_dir))?;
        let mut index = ContentRepositoryIndex::open(index_dir)?;
        index.set_autoflush(false);
        let mut report = IndexReport::default();

        for (processed, (source, resource)) in parsed.into_iter().enumerate() {
            #[cfg(test)]
            self.inject_failure(processed, &source)?;
            #[cfg(not(test))]
            let _ = processed;

            let Some(mut resource) = resource else {
                report.skipped += 1;
                observer.processed(&source, false);
                continue;
            };

            let assign_id = resource.uri().id().is_none();
            let id = match index.add(&resource) {
                Ok(id) => id,
                Err(
                    e @ (IndexError::Duplicate { .. }
                    | IndexError::PathConflict { .. }
                    | IndexError::InvalidId(_)),
                ) => {
                    log!("warning"; "skipping {}: {}", source.display(), e);
                    report.skipped += 1;
                    observer.processed(&source, false);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            resource.uri_mut().set_id(id.clone());

            let version = resource.uri().version();
            let target_dir = Layout::resource_dir_in(&staging, &id);
            let target = target_dir.join(version.document_name());
            let source_dir = source.parent().unwrap_or(source.as_path());

            if assign_id {
                // rewrite so the next reindex finds the same id
                let resource_type = resource.uri().resource_type();
                let serializer = self
                    .serializers
                    .get(resource_type)
                    .ok_or_else(|| RepositoryError::NoSerializer(resource_type.to_string()))?;
                write_atomic(&target, serializer.write(&resource)?.as_bytes())
                    .map_err(RepositoryError::io(&target))?;
                report.restructured = true;
            } else {
                copy_file(&source, &target).map_err(RepositoryError::io(&source))?;
                if source_dir != layout.resource_dir(&id) {
                    debug!("index"; "{} belongs in {}", source.display(), layout.resource_dir(&id).display());
                    report.restructured = true;
                }
            }

            let content = self
                .content_files(source_dir, version)
                .map_err(RepositoryError::io(source_dir))?;
            for file in content {
                if let Some(name) = file.file_name() {
                    copy_file(&file, &target_dir.join(name)).map_err(RepositoryError::io(&file))?;
                }
            }
            observer.processed(&source, true);
        }

        report.resources = index.resource_count();
        report.revisions = index.revision_count();
        index.flush()?;
        Ok((index, report))
    }

    /// Parse one document; problems are logged and yield `None`.
    fn read_document(&self, path: &Path, site: &str) -> Option<Resource> {
        let xml = match fs::read_to_string(path) {
            Ok(xml) => xml,
            Err(e) => {
                log!("warning"; "cannot read {}: {}", path.display(), e);
                return None;
            }
        };
        let Some(resource_type) = sniff_resource_type(&xml) else {
            log!("warning"; "{} is not a resource document", path.display());
            return None;
        };
        let Some(serializer) = self.serializers.get(&resource_type) else {
            log!("warning"; "no serializer for `{}`, skipping {}", resource_type, path.display());
            return None;
        };

        match serializer.read(&xml, site) {
            Ok(mut resource) => {
                let version = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(Version::from_document_name);
                if let Some(version) = version {
                    resource.uri_mut().set_version(version);
                }
                Some(resource)
            }
            Err(e) => {
                log!("warning"; "cannot parse {}: {}", path.display(), e);
                None
            }
        }
    }

    #[cfg(test)]
    fn inject_failure(&self, processed: usize, source: &Path) -> Result<(), RepositoryError> {
        use std::sync::atomic::Ordering;
        if processed >= self.fail_after.load(Ordering::SeqCst) {
            return Err(RepositoryError::Io {
                path: source.to_path_buf(),
                source: std::io::Error::other("injected failure"),
            });
        }
        Ok(())
    }

    /// Fail the next reindex after `documents` documents were staged.
    #[cfg(test)]
    pub(super) fn fail_after(&self, documents: usize) {
        self.fail_after
            .store(documents, std::sync::atomic::Ordering::SeqCst);
    }

    /// Fail reindexing when the new index is moved into place.
    #[cfg(test)]
    pub(super) fn fail_index_swap(&self, fail: bool) {
        self.fail_swap
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Move `current` aside to `aside` (if present) and `replacement` into its
/// place. On failure the previous state is restored.
fn swap_dirs(replacement: &Path, current: &Path, aside: &Path) -> Result<(), RepositoryError> {
    let had_current = current.exists();
    if had_current {
        fs::rename(current, aside).map_err(RepositoryError::io(current))?;
    }
    if let Err(e) = fs::rename(replacement, current) {
        if had_current {
            let _ = fs::rename(aside, current);
        }
        return Err(RepositoryError::io(replacement)(e));
    }
    Ok(())
}
