//! Code -> `Language` resolution with a process-wide cache.

use super::table::{ISO_LANGUAGES, IsoLanguage};
use super::{Language, LanguageError};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, LazyLock};

/// Lookup table over both ISO columns.
static BY_CODE: LazyLock<FxHashMap<&'static str, &'static IsoLanguage>> = LazyLock::new(|| {
    let mut map = FxHashMap::default();
    for entry in ISO_LANGUAGES {
        map.insert(entry.code, entry);
        map.insert(entry.iso3, entry);
    }
    map
});

/// Shared registry, created on first access and kept until process exit.
static SHARED: LazyLock<Arc<LanguageRegistry>> =
    LazyLock::new(|| Arc::new(LanguageRegistry::new()));

/// Resolves language codes and locale strings to cached `Language` instances.
///
/// Entries are keyed by the two-letter identifier and never change once
/// inserted, so repeated lookups return the identical `Arc`.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    cache: RwLock<FxHashMap<&'static str, Arc<Language>>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    /// Resolve a two- or three-letter code or a locale string.
    ///
    /// Accepted forms: `de`, `DEU`, `de-CH`, `de_CH_x`. A five character
    /// `xx_yy` string is a reversed `country_language` artifact of some
    /// clients: the language is the second segment, so `ch_de` is German.
    pub fn resolve(&self, code_or_locale: &str) -> Result<Arc<Language>, LanguageError> {
        let unknown = || LanguageError::Unknown(code_or_locale.to_string());
        let code = normalize_code(code_or_locale).ok_or_else(unknown)?;
        let entry = BY_CODE.get(code.as_str()).ok_or_else(unknown)?;

        if let Some(language) = self.cache.read().get(entry.code) {
            return Ok(Arc::clone(language));
        }

        let mut cache = self.cache.write();
        let language = cache.entry(entry.code).or_insert_with(|| {
            Arc::new(Language {
                code: entry.code,
                iso3: entry.iso3,
                name: entry.name,
                native_name: entry.native_name,
            })
        });
        Ok(Arc::clone(language))
    }

    /// Like `resolve`, with a miss as `None`.
    pub fn lookup(&self, code_or_locale: &str) -> Option<Arc<Language>> {
        self.resolve(code_or_locale).ok()
    }

    /// Number of languages resolved so far.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

/// Reduce a locale string to a lowercase language code candidate.
fn normalize_code(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "*" {
        return None;
    }

    let bytes = raw.as_bytes();
    let is_word = |b: &u8| b.is_ascii_alphanumeric() || *b == b'_';
    let code = if bytes.len() == 5 && bytes[2] == b'_' && bytes.iter().all(is_word) {
        &raw[3..5]
    } else {
        raw.split(['-', '_']).next().unwrap_or(raw)
    };

    let code = code.to_ascii_lowercase();
    (code.len() == 2 || code.len() == 3).then_some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_two_and_three_letter_codes() {
        let registry = LanguageRegistry::new();
        let de = registry.resolve("de").unwrap();
        let deu = registry.resolve("DEU").unwrap();

        assert!(Arc::ptr_eq(&de, &deu));
        assert_eq!(de.identifier(), "de");
        assert_eq!(registry.cached(), 1);
    }

    #[test]
    fn test_resolve_locale_forms() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.resolve("de-CH").unwrap().identifier(), "de");
        assert_eq!(registry.resolve(" fr ").unwrap().identifier(), "fr");
        assert_eq!(registry.resolve("zh_Hant_TW").unwrap().identifier(), "zh");
    }

    #[test]
    fn test_reversed_country_language_is_swapped() {
        let registry = LanguageRegistry::new();
        assert_eq!(registry.resolve("CH_de").unwrap().identifier(), "de");
        // The workaround applies to every `xx_yy` string
        assert_eq!(registry.resolve("de_CH").unwrap().identifier(), "ch");
    }

    #[test]
    fn test_unknown_languages() {
        let registry = LanguageRegistry::new();
        assert_eq!(
            registry.resolve("*"),
            Err(LanguageError::Unknown("*".to_string()))
        );
        assert!(registry.resolve("").is_err());
        assert!(registry.resolve("xx").is_err());
        assert!(registry.resolve("english").is_err());
        assert!(registry.lookup("qq").is_none());
        assert_eq!(registry.cached(), 0);
    }

    #[test]
    fn test_shared_registry_is_reference_stable() {
        let a = LanguageRegistry::shared().resolve("it").unwrap();
        let b = LanguageRegistry::shared().resolve("ita").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
