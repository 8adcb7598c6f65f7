//! Requested output representation, encoded as the URL file extension.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Flavor {
    #[default]
    Html,
    Xml,
    Json,
}

impl Flavor {
    pub const ALL: [Flavor; 3] = [Flavor::Html, Flavor::Xml, Flavor::Json];

    /// Lowercase file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }

    /// Case-insensitive parse of an extension or segment (`json`, `JSON`).
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(value))
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
