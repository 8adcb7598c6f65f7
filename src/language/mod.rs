//! Languages and language negotiation.
//!
//! # Module Structure
//!
//! ```text
//! language/
//! ├── table      # ISO 639 code table
//! ├── registry   # LanguageRegistry: code -> cached Arc<Language>
//! ├── accept     # Accept-Language header parsing
//! ├── preferred  # PreferredLanguageResolver
//! └── mod.rs     # Language, LanguageError (this file)
//! ```
//!
//! Every `Language` handed out by a registry is shared: resolving `de`,
//! `DEU` or `de-CH` twice yields the same `Arc`.

mod accept;
mod preferred;
mod registry;
mod table;

pub use accept::parse_accept_language;
pub use preferred::{LanguageChoice, PreferredLanguageResolver, path_segments};
pub use registry::LanguageRegistry;

use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Language lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    #[error("unknown language `{0}`")]
    Unknown(String),
}

/// An ISO 639 language.
///
/// Equality and hashing use the two-letter identifier only.
#[derive(Debug)]
pub struct Language {
    code: &'static str,
    iso3: &'static str,
    name: &'static str,
    native_name: &'static str,
}

impl Language {
    /// Two-letter ISO 639-1 identifier, e.g. `de`.
    pub fn identifier(&self) -> &'static str {
        self.code
    }

    /// Three-letter ISO 639-2/T code, e.g. `deu`.
    pub fn iso3(&self) -> &'static str {
        self.iso3
    }

    /// English name, e.g. `German`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name in the language itself, e.g. `Deutsch`.
    pub fn native_name(&self) -> &'static str {
        self.native_name
    }

    /// Display name of this language for a reader of `target`.
    ///
    /// The native name when both are the same language, the English name otherwise.
    pub fn display_name(&self, target: &Language) -> &'static str {
        if self == target {
            self.native_name
        } else {
            self.name
        }
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Language {}

impl Hash for Language {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_depends_on_reader() {
        let registry = LanguageRegistry::new();
        let de = registry.resolve("de").unwrap();
        let en = registry.resolve("en").unwrap();

        assert_eq!(de.display_name(&de), "Deutsch");
        assert_eq!(de.display_name(&en), "German");
        assert_eq!(de.to_string(), "de");
        assert_eq!(de.iso3(), "deu");
    }
}
