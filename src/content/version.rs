//! Resource versions and their file and URL selectors.
//!
//! | Version       | URL selector | Document     | XML attribute |
//! |---------------|--------------|--------------|---------------|
//! | `Live`        | `index`      | `index.xml`  | `live`        |
//! | `Work`        | `work`       | `work.xml`   | `work`        |
//! | `Revision(n)` | `n`          | `n.xml`      | `n`           |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File extension of revision documents.
pub const DOCUMENT_EXTENSION: &str = "xml";

/// A resource version: one of the two distinguished states or a numbered revision.
///
/// Ordering: `Live < Work < Revision(0) < Revision(1) < ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Version {
    Live,
    Work,
    Revision(u64),
}

impl Version {
    /// Selector used in URLs and document names.
    pub fn selector(&self) -> String {
        match self {
            Self::Live => "index".to_string(),
            Self::Work => "work".to_string(),
            Self::Revision(n) => n.to_string(),
        }
    }

    /// Parse a URL / file selector. `live` is accepted as an alias of `index`.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "index" | "live" => Some(Self::Live),
            "work" => Some(Self::Work),
            other => other.parse().ok().map(Self::Revision),
        }
    }

    /// File name of the revision document, e.g. `work.xml`.
    pub fn document_name(&self) -> String {
        format!("{}.{DOCUMENT_EXTENSION}", self.selector())
    }

    /// Version stored in a revision document name.
    pub fn from_document_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(DOCUMENT_EXTENSION)?.strip_suffix('.')?;
        Self::from_selector(stem)
    }

    /// Value of the `version` attribute in resource documents.
    pub fn as_attribute(&self) -> String {
        match self {
            Self::Live => "live".to_string(),
            other => other.selector(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_attribute())
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_selector(&s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("invalid version `{s}`"))
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.as_attribute()
    }
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors() {
        assert_eq!(Version::Live.selector(), "index");
        assert_eq!(Version::Work.selector(), "work");
        assert_eq!(Version::Revision(17).selector(), "17");
        assert_eq!(Version::from_selector("live"), Some(Version::Live));
        assert_eq!(Version::from_selector("17"), Some(Version::Revision(17)));
        assert_eq!(Version::from_selector("-1"), None);
        assert_eq!(Version::from_selector("draft"), None);
    }

    #[test]
    fn test_document_names() {
        assert_eq!(Version::Live.document_name(), "index.xml");
        assert_eq!(Version::Revision(3).document_name(), "3.xml");
        assert_eq!(Version::from_document_name("work.xml"), Some(Version::Work));
        assert_eq!(Version::from_document_name("work_de.pdf"), None);
        assert_eq!(Version::from_document_name("xml"), None);
    }

    #[test]
    fn test_revision_zero_is_not_live() {
        assert_ne!(Version::Revision(0), Version::Live);
        assert!(Version::Live < Version::Work);
        assert!(Version::Work < Version::Revision(0));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&vec![Version::Live, Version::Revision(2)]).unwrap();
        assert_eq!(json, r#"["live","2"]"#);
        let parsed: Vec<Version> = serde_json::from_str(r#"["work","index"]"#).unwrap();
        assert_eq!(parsed, vec![Version::Work, Version::Live]);
    }
}
