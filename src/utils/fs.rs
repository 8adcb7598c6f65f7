//! Filesystem helpers shared by the repository and the config loader.
//!
//! - `normalize_path` - absolute form (canonicalize + fallback)
//! - `expand_path` - `~` expansion for configured directories
//! - `write_atomic` / `write_atomic_from` - temp file + rename
//! - `unused_sibling` - `name-old`, `name-old 2`, ... for trees moved aside
//! - `prune_empty_dirs` - remove empty parents up to a sentinel directory

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to the path itself when absolute, or joined with the
/// current directory when relative.
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Expand a leading `~` in a configured directory.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Temp file name next to `target`, unique within this process.
fn temp_sibling(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(".{name}.{}-{seq}.tmp", std::process::id()))
}

/// Write `bytes` to `target` through a temp file in the same directory.
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    write_atomic_from(target, bytes).map(|_| ())
}

/// Stream `reader` into `target` through a temp file in the same directory.
///
/// Returns the number of bytes written. The temp file is removed on failure.
pub fn write_atomic_from(target: &Path, mut reader: impl Read) -> io::Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp = temp_sibling(target);
    let result = (|| {
        let mut file = File::create(&temp)?;
        let written = io::copy(&mut reader, &mut file)?;
        file.flush()?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, target)?;
        Ok(written)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

/// Copy `from` to `to`, creating the parent directories of `to`.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)
}

/// First non-existing sibling named `<name>-old`, `<name>-old 2`, ...
pub fn unused_sibling(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut candidate = dir.with_file_name(format!("{name}-old"));
    let mut n = 2;
    while candidate.exists() {
        candidate = dir.with_file_name(format!("{name}-old {n}"));
        n += 1;
    }
    candidate
}

/// Remove `start` and its parents while they are empty, stopping at `stop`.
///
/// `stop` itself is never removed. Directories outside `stop` are left alone.
pub fn prune_empty_dirs(start: &Path, stop: &Path) -> io::Result<()> {
    let mut current = start.to_path_buf();
    while current != stop && current.starts_with(stop) {
        let is_empty = match fs::read_dir(&current) {
            Ok(mut entries) => entries.next().is_none(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e),
        };
        if !is_empty {
            break;
        }
        fs::remove_dir(&current)?;
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
    Ok(())
}

/// Remove a directory tree if present.
pub fn remove_tree(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
