//! Logical resource path type.
//!
//! - Internal representation: always decoded (human-readable)
//! - HTTP boundary: `from_browser` decodes, `to_encoded` encodes

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Characters left alone when encoding a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Decoded logical path of a resource.
///
/// Invariants:
/// - Always starts and ends with `/`
/// - No empty segments (`//` collapses)
/// - No query string or fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourcePath(Arc<str>);

impl ResourcePath {
    /// Create from a decoded path, normalizing slashes.
    pub fn new(decoded: &str) -> Self {
        let path = decoded.trim().split(['?', '#']).next().unwrap_or_default();

        let mut normalized = String::with_capacity(path.len() + 2);
        normalized.push('/');
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            normalized.push_str(segment);
            normalized.push('/');
        }
        Self(Arc::from(normalized))
    }

    /// Create from a browser path (percent-decoded, query string stripped).
    pub fn from_browser(encoded: &str) -> Self {
        let path = encoded.split('?').next().unwrap_or(encoded);
        let decoded = percent_decode_str(path)
            .decode_utf8()
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| path.to_string());
        Self::new(&decoded)
    }

    /// The root path `/`.
    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encode every segment, keeping the `/` separators.
    pub fn to_encoded(&self) -> String {
        self.0
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Non-empty segments, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.as_ref() == "/"
    }

    /// `/news/2024/` -> `/news/`, `/news/` -> `/`, `/` -> `None`
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.0.trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self(Arc::from(format!("{}/", &trimmed[..idx])))),
            _ => Some(Self::root()),
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for ResourcePath {
    fn default() -> Self {
        Self::root()
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourcePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourcePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourcePath {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl PartialEq<str> for ResourcePath {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ResourcePath {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for ResourcePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourcePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_slashes() {
        assert_eq!(ResourcePath::new("test"), "/test/");
        assert_eq!(ResourcePath::new("/test"), "/test/");
        assert_eq!(ResourcePath::new("//a///b/"), "/a/b/");
        assert_eq!(ResourcePath::new(""), "/");
        assert_eq!(ResourcePath::new("/"), "/");
    }

    #[test]
    fn test_new_strips_query_and_fragment() {
        assert_eq!(ResourcePath::new("/test/#live"), "/test/");
        assert_eq!(ResourcePath::new("/test?v=1#x"), "/test/");
    }

    #[test]
    fn test_from_browser_decodes() {
        assert_eq!(ResourcePath::from_browser("/hello%20world/"), "/hello world/");
        assert_eq!(ResourcePath::from_browser("/%E4%B8%AD%E6%96%87"), "/中文/");
        // Invalid UTF-8 sequence is preserved
        assert_eq!(ResourcePath::from_browser("/x/%FF/"), "/x/%FF/");
    }

    #[test]
    fn test_to_encoded() {
        assert_eq!(
            ResourcePath::new("/my-page/hello world/").to_encoded(),
            "/my-page/hello%20world/"
        );
        assert_eq!(ResourcePath::new("/中文/").to_encoded(), "/%E4%B8%AD%E6%96%87/");
    }

    #[test]
    fn test_parent_and_segments() {
        let path = ResourcePath::new("/news/2024/");
        assert_eq!(path.parent(), Some(ResourcePath::new("/news/")));
        assert_eq!(ResourcePath::new("/news/").parent(), Some(ResourcePath::root()));
        assert_eq!(ResourcePath::root().parent(), None);
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["news", "2024"]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let path = ResourcePath::new("/über/");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""/über/""#);
        let parsed: ResourcePath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
