use super::{Flavor, ResourcePath, UrlError, WebUrl};
use crate::content::Version;
use crate::debug;
use crate::language::{Language, LanguageRegistry};
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// `<path>/<version>[_<lang>].<flavor>`
static SELECTOR_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)/(work|index|live|[0-9]*)(_[a-zA-Z]+)?\.([a-zA-Z0-9]+)$").unwrap()
});

/// Characters accepted in segmented paths.
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-,.:;()/_~!$&*'+=@%^".contains(c)
}

/// Encodes and decodes `WebUrl`s.
///
/// Languages are resolved through the injected registry, or restricted to a
/// site's languages with `decode_for`.
#[derive(Debug, Clone)]
pub struct UrlCodec {
    registry: Arc<LanguageRegistry>,
}

impl Default for UrlCodec {
    fn default() -> Self {
        Self::new(LanguageRegistry::shared())
    }
}

impl UrlCodec {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<LanguageRegistry> {
        &self.registry
    }

    /// Selector form of `url`.
    #[inline]
    pub fn encode(&self, url: &WebUrl) -> String {
        url.link()
    }

    /// Decode a request path or absolute url, accepting any known language.
    pub fn decode(&self, raw: &str) -> Result<WebUrl, UrlError> {
        self.decode_with(raw, |code| self.registry.lookup(code))
    }

    /// Decode, accepting only the given (site) languages.
    ///
    /// A selector language outside `languages` decodes as no language.
    pub fn decode_for(&self, raw: &str, languages: &[Arc<Language>]) -> Result<WebUrl, UrlError> {
        self.decode_with(raw, |code| {
            let language = self.registry.lookup(code)?;
            languages.iter().find(|l| **l == language).map(Arc::clone)
        })
    }

    fn decode_with(
        &self,
        raw: &str,
        lookup: impl Fn(&str) -> Option<Arc<Language>>,
    ) -> Result<WebUrl, UrlError> {
        let path = if raw.contains(":/") {
            let parsed =
                url::Url::parse(raw).map_err(|_| UrlError::Unparsable(raw.to_string()))?;
            parsed.path().to_string()
        } else {
            raw.trim()
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string()
        };

        if !path.starts_with('/') {
            return Err(UrlError::NotAbsolute(raw.to_string()));
        }

        if let Some(caps) = SELECTOR_FORM.captures(&path) {
            let mut url = WebUrl::new(ResourcePath::from_browser(&caps[1]));

            // empty or unparsable selectors stay live
            if let Some(version) = caps.get(2).and_then(|v| Version::from_selector(v.as_str())) {
                url.version = version;
            }

            if let Some(code) = caps.get(3) {
                let code = &code.as_str()[1..];
                url.language = lookup(code);
                if url.language.is_none() {
                    debug!("url"; "ignoring unsupported language `{}` in {}", code, path);
                }
            }

            match Flavor::parse(&caps[4]) {
                Some(flavor) => url.flavor = flavor,
                None => debug!("url"; "unknown flavor `{}` in {}", &caps[4], path),
            }
            return Ok(url);
        }

        if !path.chars().all(is_path_char) {
            return Err(UrlError::InvalidPath(raw.to_string()));
        }

        // /path/to/resource/[<language>/][<flavor>/], read from the end
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut flavor = None;
        let mut language = None;
        while let Some(&segment) = segments.last() {
            if flavor.is_none()
                && language.is_none()
                && let Some(f) = Flavor::parse(segment)
            {
                flavor = Some(f);
            } else if language.is_none()
                && let Some(l) = lookup(segment)
            {
                language = Some(l);
            } else {
                break;
            }
            segments.pop();
        }

        let mut url = WebUrl::new(ResourcePath::from_browser(&segments.join("/")));
        url.flavor = flavor.unwrap_or_default();
        url.language_in_path = language.is_some();
        url.language = language;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> UrlCodec {
        UrlCodec::new(Arc::new(LanguageRegistry::new()))
    }

    fn lang(code: &str) -> Arc<Language> {
        LanguageRegistry::shared().resolve(code).unwrap()
    }

    // ========================================================================
    // selector form
    // ========================================================================

    #[test]
    fn test_decode_versioned_localized_flavored() {
        let url = codec().decode("/test/17_de.json").unwrap();
        assert_eq!(url.path(), "/test/");
        assert_eq!(url.version(), Version::Revision(17));
        assert_eq!(url.language().map(|l| l.identifier()), Some("de"));
        assert_eq!(url.flavor(), Flavor::Json);
        assert!(!url.language_in_path());
    }

    #[test]
    fn test_decode_selector_variants() {
        let codec = codec();

        let url = codec.decode("/test/index_de.html").unwrap();
        assert_eq!(url.version(), Version::Live);
        assert_eq!(url.language(), Some(&lang("de")));

        let url = codec.decode("/test/live.json").unwrap();
        assert_eq!(url.version(), Version::Live);
        assert_eq!(url.flavor(), Flavor::Json);

        let url = codec.decode("/test/work.xml").unwrap();
        assert_eq!(url.version(), Version::Work);
        assert_eq!(url.flavor(), Flavor::Xml);

        let url = codec.decode("/test/17.html").unwrap();
        assert_eq!(url.version(), Version::Revision(17));
        assert_eq!(url.language(), None);
    }

    #[test]
    fn test_decode_unknown_flavor_and_language() {
        let url = codec().decode("/test/index_xx.pdf").unwrap();
        assert_eq!(url.path(), "/test/");
        assert_eq!(url.language(), None);
        assert_eq!(url.flavor(), Flavor::Html);
    }

    #[test]
    fn test_decode_absolute_url() {
        let url = codec()
            .decode("https://www.test.com:8080/test/17_de.json?x=1#top")
            .unwrap();
        assert_eq!(url.link(), "/test/17_de.json");

        let url = codec().decode("http://www.test.com/test/").unwrap();
        assert_eq!(url.link(), "/test/");
    }

    #[test]
    fn test_decode_percent_encoded_path() {
        let codec = codec();

        let url = codec.decode("http://www.demo.org/%C3%BCber%20uns/").unwrap();
        assert_eq!(url.path(), "/über uns/");

        let url = codec.decode("/%C3%BCber%20uns/work_de.json").unwrap();
        assert_eq!(url.path(), "/über uns/");
        assert_eq!(url.version(), Version::Work);
        assert_eq!(url.language(), Some(&lang("de")));

        let url = codec.decode("http://www.demo.org/caf%C3%A9/de/").unwrap();
        assert_eq!(url.path(), "/café/");
        assert_eq!(url.language(), Some(&lang("de")));
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            codec().decode("test/"),
            Err(UrlError::NotAbsolute("test/".to_string()))
        );
        assert!(matches!(
            codec().decode("/test/<script>/"),
            Err(UrlError::InvalidPath(_))
        ));
        assert!(matches!(
            codec().decode("http://[::1"),
            Err(UrlError::Unparsable(_))
        ));
    }

    #[test]
    fn test_all_allowed_characters() {
        let path = "/abcdefghijklmnopqrstuvwxyz/ABCDEFGHIJKLMNOPQRSTUVWXYZ/0123456789/-_.~!$&*'()+,;=:@%20";
        assert!(codec().decode(path).is_ok());
    }

    // ========================================================================
    // segmented form
    // ========================================================================

    #[test]
    fn test_decode_segmented() {
        let codec = codec();

        let url = codec.decode("/test/de/json/").unwrap();
        assert_eq!(url.path(), "/test/");
        assert_eq!(url.language(), Some(&lang("de")));
        assert_eq!(url.flavor(), Flavor::Json);
        assert!(url.language_in_path());
        assert_eq!(url.link(), "/test/index_de.json");

        for raw in ["/test/json", "/test/JSON", "/test/json/", "/test/de/json"] {
            assert_eq!(codec.decode(raw).unwrap().flavor(), Flavor::Json, "{raw}");
        }
    }

    #[test]
    fn test_decode_segmented_stops_at_plain_segment() {
        let url = codec().decode("/test/work/de/json").unwrap();
        assert_eq!(url.path(), "/test/work/");
        assert_eq!(url.version(), Version::Live);
        assert_eq!(url.flavor(), Flavor::Json);

        // a language segment followed by a flavor segment is just a path
        let url = codec().decode("/test/json/de/").unwrap();
        assert_eq!(url.path(), "/test/json/");
        assert_eq!(url.flavor(), Flavor::Html);
    }

    #[test]
    fn test_decode_for_site_languages() {
        let site = vec![lang("en"), lang("de")];
        let codec = codec();

        let url = codec.decode_for("/test/index_fr.html", &site).unwrap();
        assert_eq!(url.language(), None);

        let url = codec.decode_for("/test/fr/", &site).unwrap();
        assert_eq!(url.path(), "/test/fr/");

        let url = codec.decode_for("/test/de/", &site).unwrap();
        assert_eq!(url.path(), "/test/");
        assert_eq!(url.language(), Some(&lang("de")));
    }

    // ========================================================================
    // round trip
    // ========================================================================

    #[test]
    fn test_end_to_end_scenario() {
        let codec = codec();
        let url = WebUrl::new("/test/")
            .with_version(Version::Revision(17))
            .with_language(Some(lang("de")))
            .with_flavor(Flavor::Json);

        let encoded = codec.encode(&url);
        assert_eq!(encoded, "/test/17_de.json");
        assert_eq!(codec.decode(&encoded).unwrap(), url);
    }

    #[test]
    fn test_round_trip_all_combinations() {
        let codec = codec();
        let paths = [
            "/",
            "/test/",
            "/news/2024/summer-party/",
            "/json/",
            "/html/",
            "/news/de/",
            "/shop/XML/",
            "/de/json/",
        ];
        let languages = [None, Some(lang("de")), Some(lang("fr")), Some(lang("en"))];
        let versions = [
            Version::Live,
            Version::Work,
            Version::Revision(0),
            Version::Revision(17),
        ];

        for path in paths {
            for language in &languages {
                for version in versions {
                    for flavor in Flavor::ALL {
                        let url = WebUrl::new(path)
                            .with_version(version)
                            .with_language(language.clone())
                            .with_flavor(flavor);
                        let encoded = codec.encode(&url);
                        let decoded = codec.decode(&encoded).unwrap();
                        assert_eq!(decoded, url, "{encoded}");
                        assert_eq!(codec.encode(&decoded), encoded);
                    }
                }
            }
        }
    }
}
