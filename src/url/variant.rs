//! Language variants of file names: `work.pdf` <-> `work_de.pdf`.
//!
//! A variant carries `_<code>` right before the extension (or at the end
//! when there is none). Any such two-letter suffix that resolves to a known
//! language counts as a variant, so `report_it.txt` reads as the Italian
//! variant of `report.txt`.

use super::UrlCodec;
use crate::language::Language;
use std::sync::Arc;

/// Byte offset of a `_xx` language suffix: the last `_`, followed by exactly
/// two characters and then the extension dot or the end of the name.
fn suffix_position(name: &str) -> Option<usize> {
    let pos = name.rfind('_')?;
    let rest = &name[pos + 1..];
    let code = rest.get(..2)?;
    let tail = &rest[2..];
    (code.chars().all(|c| c.is_ascii_alphabetic()) && (tail.is_empty() || tail.starts_with('.')))
        .then_some(pos)
}

impl UrlCodec {
    /// `index.xml` + German -> `index_de.xml`.
    pub fn language_variant(&self, name: &str, language: &Language) -> String {
        let (stem, extension) = match name.rfind('.') {
            Some(pos) => name.split_at(pos),
            None => (name, ""),
        };
        format!("{stem}_{}{extension}", language.identifier())
    }

    /// Variants for each language in order, then `name` itself as the last fallback.
    pub fn language_variants(&self, name: &str, languages: &[Arc<Language>]) -> Vec<String> {
        languages
            .iter()
            .map(|language| self.language_variant(name, language))
            .chain(std::iter::once(name.to_string()))
            .collect()
    }

    /// Language encoded in a file name, if any.
    pub fn extract_language(&self, name: &str) -> Option<Arc<Language>> {
        let pos = suffix_position(name)?;
        self.registry().lookup(&name[pos + 1..pos + 3])
    }

    /// `file_de.jsp` -> `file.jsp`; unchanged when no language is encoded.
    pub fn base_version(&self, name: &str) -> String {
        match suffix_position(name) {
            Some(pos) if self.extract_language(name).is_some() => {
                format!("{}{}", &name[..pos], &name[pos + 3..])
            }
            _ => name.to_string(),
        }
    }
}
