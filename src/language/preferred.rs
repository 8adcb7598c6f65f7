//! Response language negotiation.
//!
//! Priority (first match wins, only `candidates` qualify):
//!
//! | Step | Source                                   | Extra condition         |
//! |------|------------------------------------------|-------------------------|
//! | 1    | request path segment equal to a code     |                         |
//! | 2    | `Accept-Language` locales, best first    | supported by the site   |
//! | 3    | original language of the content         | supported by the site   |
//! | 4    | site default language                    |                         |
//! | 5    | site languages in configured order       |                         |

use super::{Language, LanguageRegistry};
use std::sync::Arc;

/// Inputs for one language decision.
#[derive(Debug, Clone, Copy)]
pub struct LanguageChoice<'a> {
    candidates: &'a [Arc<Language>],
    path_segments: &'a [&'a str],
    accept_locales: &'a [String],
    original: Option<&'a Language>,
    site_default: &'a Arc<Language>,
    site_languages: &'a [Arc<Language>],
}

impl<'a> LanguageChoice<'a> {
    /// Languages the content exists in, plus the site's language setup.
    pub fn new(
        candidates: &'a [Arc<Language>],
        site_default: &'a Arc<Language>,
        site_languages: &'a [Arc<Language>],
    ) -> Self {
        Self {
            candidates,
            path_segments: &[],
            accept_locales: &[],
            original: None,
            site_default,
            site_languages,
        }
    }

    pub fn path_segments(mut self, segments: &'a [&'a str]) -> Self {
        self.path_segments = segments;
        self
    }

    /// Locales from the `Accept-Language` header, best first.
    pub fn accept_locales(mut self, locales: &'a [String]) -> Self {
        self.accept_locales = locales;
        self
    }

    pub fn original(mut self, language: Option<&'a Language>) -> Self {
        self.original = language;
        self
    }

    fn candidate(&self, language: &Language) -> Option<Arc<Language>> {
        self.candidates
            .iter()
            .find(|c| c.as_ref() == language)
            .map(Arc::clone)
    }

    fn site_supports(&self, language: &Language) -> bool {
        self.site_default.as_ref() == language
            || self.site_languages.iter().any(|l| l.as_ref() == language)
    }
}

/// Picks the response language for a request.
#[derive(Debug, Clone)]
pub struct PreferredLanguageResolver {
    registry: Arc<LanguageRegistry>,
}

impl PreferredLanguageResolver {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    /// Choose a language, or `None` when no candidate qualifies.
    pub fn resolve(&self, choice: &LanguageChoice<'_>) -> Option<Arc<Language>> {
        // 1. explicit language in the request path
        for segment in choice.path_segments {
            if let Some(language) = choice
                .candidates
                .iter()
                .find(|c| c.identifier() == *segment)
            {
                return Some(Arc::clone(language));
            }
        }

        // 2. client preference; unknown tags and `*` are skipped
        for locale in choice.accept_locales {
            let Some(language) = self.registry.lookup(locale) else {
                continue;
            };
            if choice.site_supports(&language)
                && let Some(language) = choice.candidate(&language)
            {
                return Some(language);
            }
        }

        // 3. original content language
        if let Some(original) = choice.original
            && choice.site_supports(original)
            && let Some(language) = choice.candidate(original)
        {
            return Some(language);
        }

        // 4. site default
        if let Some(language) = choice.candidate(choice.site_default) {
            return Some(language);
        }

        // 5. first site language the content has
        choice
            .site_languages
            .iter()
            .find_map(|language| choice.candidate(language))
    }

    /// Best site language for a client, falling back to the site default.
    pub fn preferred_site_language(
        &self,
        accept_locales: &[String],
        site_default: &Arc<Language>,
        site_languages: &[Arc<Language>],
    ) -> Arc<Language> {
        accept_locales
            .iter()
            .filter_map(|locale| self.registry.lookup(locale))
            .find_map(|language| {
                site_languages
                    .iter()
                    .find(|l| **l == language)
                    .map(Arc::clone)
            })
            .unwrap_or_else(|| Arc::clone(site_default))
    }
}

/// Non-empty segments of a request path.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
