//! Localized, versioned resource URLs.
//!
//! A `WebUrl` is a logical resource path plus the version, language and
//! flavor a client asked for. Two textual forms exist:
//!
//! ```text
//! /test/17_de.json     selector form:  <path>/<version>[_<lang>].<flavor>
//! /test/de/json/       segmented form: <path>/[<lang>/][<flavor>/]
//! ```
//!
//! `UrlCodec` turns strings into `WebUrl`s and back; `WebUrl::link` always
//! renders the selector form, `WebUrl::normalize` the segmented one.

mod codec;
mod flavor;
mod path;
mod variant;

pub use codec::UrlCodec;
pub use flavor::Flavor;
pub use path::ResourcePath;

use crate::content::Version;
use crate::language::{Language, LanguageRegistry};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("path `{0}` must be absolute")]
    NotAbsolute(String),

    #[error("url `{0}` cannot be parsed")]
    Unparsable(String),

    #[error("path `{0}` contains invalid characters")]
    InvalidPath(String),
}

/// A decoded resource URL.
#[derive(Debug, Clone)]
pub struct WebUrl {
    path: ResourcePath,
    version: Version,
    language: Option<Arc<Language>>,
    flavor: Flavor,
    language_in_path: bool,
}

impl WebUrl {
    /// Live, default flavor, no language.
    pub fn new(path: impl Into<ResourcePath>) -> Self {
        Self {
            path: path.into(),
            version: Version::Live,
            language: None,
            flavor: Flavor::default(),
            language_in_path: false,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_language(mut self, language: Option<Arc<Language>>) -> Self {
        self.language = language;
        self
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn language(&self) -> Option<&Arc<Language>> {
        self.language.as_ref()
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Whether the language came from a path segment (`/test/de/`).
    pub fn language_in_path(&self) -> bool {
        self.language_in_path
    }

    /// Selector form of this url.
    ///
    /// The bare path is returned for live, unlocalized, default-flavor urls
    /// unless its last segment would decode as a language or flavor.
    pub fn link(&self) -> String {
        self.link_with(None, None, None)
    }

    /// Selector form with individual parts overridden.
    ///
    /// Any override forces the selector, so `link_with(Some(Live), None, None)`
    /// yields `/test/index.html` rather than `/test/`.
    pub fn link_with(
        &self,
        version: Option<Version>,
        language: Option<&Language>,
        flavor: Option<Flavor>,
    ) -> String {
        let mut link = self.path.to_string();
        link.push_str(&self.selector(version, language, flavor));
        link
    }

    /// Percent-encoded selector form, safe for `Location` headers and markup.
    pub fn encoded_link(&self) -> String {
        let mut link = self.path.to_encoded();
        link.push_str(&self.selector(None, None, None));
        link
    }

    fn selector(
        &self,
        version: Option<Version>,
        language: Option<&Language>,
        flavor: Option<Flavor>,
    ) -> String {
        let explicit = version.is_some() || language.is_some() || flavor.is_some();
        let version = version.unwrap_or(self.version);
        let language = language.or(self.language.as_deref());
        let flavor = flavor.unwrap_or(self.flavor);

        if !explicit
            && version == Version::Live
            && language.is_none()
            && flavor.is_default()
            && !self.has_selector_like_tail()
        {
            return String::new();
        }

        let mut selector = version.selector();
        if let Some(language) = language {
            selector.push('_');
            selector.push_str(language.identifier());
        }
        selector.push('.');
        selector.push_str(flavor.extension());
        selector
    }

    /// `/json/` or `/news/de/` would lose their last segment when decoded.
    fn has_selector_like_tail(&self) -> bool {
        self.path.segments().last().is_some_and(|segment| {
            Flavor::parse(segment).is_some() || LanguageRegistry::shared().lookup(segment).is_some()
        })
    }

    /// Segmented form, e.g. `/test/de/json/`.
    ///
    /// Non-live versions can't be expressed as segments, so including the
    /// version falls back to the selector form.
    pub fn normalize(
        &self,
        include_version: bool,
        include_language: bool,
        include_flavor: bool,
    ) -> String {
        let mut buf = self.path.to_string();
        let language = self.language.as_deref().filter(|_| include_language);

        if include_version && self.version != Version::Live {
            buf.push_str(&self.version.selector());
            if let Some(language) = language {
                buf.push('_');
                buf.push_str(language.identifier());
            }
            buf.push('.');
            let flavor = if include_flavor {
                self.flavor
            } else {
                Flavor::default()
            };
            buf.push_str(flavor.extension());
            return buf;
        }

        if let Some(language) = language {
            buf.push_str(language.identifier());
            buf.push('/');
        }
        if include_flavor && !self.flavor.is_default() {
            buf.push_str(self.flavor.extension());
            buf.push('/');
        }
        buf
    }
}

/// Equality over (path, version, language, flavor); how the language was
/// encoded does not matter.
impl PartialEq for WebUrl {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.version == other.version
            && self.language == other.language
            && self.flavor == other.flavor
    }
}

impl Eq for WebUrl {}

impl fmt::Display for WebUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.link())
    }
}
