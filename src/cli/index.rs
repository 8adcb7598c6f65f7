//! `index` command: rebuild site indexes with a progress line.

use crate::config::cfg;
use crate::language::LanguageRegistry;
use crate::log;
use crate::logger::ProgressLine;
use crate::repository::{ContentRepository, FileSystemContentRepository, IndexObserver};
use anyhow::{Context, Result, bail};
use parking_lot::Mutex;
use std::path::Path;

/// Feeds reindex progress into a `ProgressLine`.
#[derive(Default)]
struct Progress {
    line: Mutex<Option<ProgressLine>>,
}

impl IndexObserver for Progress {
    fn walked(&self, documents: usize) {
        *self.line.lock() = Some(ProgressLine::new(
            "index",
            &[("indexed", documents), ("skipped", documents)],
        ));
    }

    fn processed(&self, _document: &Path, indexed: bool) {
        if let Some(line) = self.line.lock().as_ref() {
            line.inc(if indexed { "indexed" } else { "skipped" });
        }
    }
}

impl Progress {
    fn finish(&self) {
        if let Some(line) = self.line.lock().take() {
            line.finish();
        }
    }
}

pub fn index_sites(selected: &[String], root: Option<&Path>) -> Result<()> {
    let config = cfg();
    for id in selected {
        if config.site(id).is_none() {
            bail!("site `{id}` is not configured");
        }
    }

    let registry = LanguageRegistry::shared();
    let repository_root = config.repository_root(root);
    let entries = config
        .sites
        .iter()
        .filter(|s| selected.is_empty() || selected.contains(&s.id));

    for entry in entries {
        let site = entry.build(&registry)?;
        // the reindex below replaces whatever connect would rebuild
        let repository = FileSystemContentRepository::with_defaults(repository_root.clone())
            .with_rebuild_on_connect(false);
        repository
            .connect(&site)
            .with_context(|| format!("cannot connect repository of site `{}`", entry.id))?;

        let progress = Progress::default();
        let result = repository.index_with(&progress);
        progress.finish();
        let report = result.with_context(|| format!("reindex of site `{}` failed", entry.id))?;

        repository.disconnect()?;
        log!("index"; "{}: {}", entry.id, report);
    }
    Ok(())
}
