//! Request dispatch: from an inbound url to a stored revision.
//!
//! ```text
//! http://www.demo.org/news/work_de.html   Accept-Language: fr, en;q=0.8
//!   host          www.demo.org      -> Site (SiteManager)
//!   path          /news/work_de.html -> WebUrl (UrlCodec, site languages)
//!   revision      /news @ work      -> RevisionInfo (index)
//!   language      url, path, header, original, site default
//!   resource      Resource (repository)
//! ```

use crate::content::{Resource, ResourceUri, types};
use crate::debug;
use crate::language::{
    Language, LanguageChoice, PreferredLanguageResolver, parse_accept_language, path_segments,
};
use crate::repository::RepositoryError;
use crate::site::{Site, SiteManager, host_of};
use crate::url::{UrlCodec, UrlError, WebUrl};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no site serves host `{0}`")]
    UnknownHost(String),

    #[error("site `{0}` is offline")]
    Offline(String),

    #[error("site `{0}` has no content repository")]
    NoRepository(String),

    #[error("site `{site}` has no resource at `{target}`")]
    NotFound { site: String, target: String },

    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub site: Arc<Site>,
    pub url: WebUrl,
    pub uri: ResourceUri,
    /// Response language; `None` when the revision has no localized content.
    pub language: Option<Arc<Language>>,
    pub resource: Resource,
}

/// Resolves requests against the registered sites.
#[derive(Debug)]
pub struct RequestResolver {
    sites: Arc<SiteManager>,
    codec: UrlCodec,
    languages: PreferredLanguageResolver,
}

impl RequestResolver {
    pub fn new(sites: Arc<SiteManager>, codec: UrlCodec) -> Self {
        let languages = PreferredLanguageResolver::new(Arc::clone(codec.registry()));
        Self {
            sites,
            codec,
            languages,
        }
    }

    pub fn sites(&self) -> &Arc<SiteManager> {
        &self.sites
    }

    /// Dispatch an absolute request url with an optional `Accept-Language`
    /// header value.
    pub fn resolve(
        &self,
        url: &str,
        accept_language: Option<&str>,
    ) -> Result<Dispatched, DispatchError> {
        let site = self
            .sites
            .find_site_by_url(url)
            .ok_or_else(|| DispatchError::UnknownHost(host_of(url).to_string()))?;
        if !site.is_online() {
            return Err(DispatchError::Offline(site.identifier().to_string()));
        }
        let repository = site
            .content_repository()
            .ok_or_else(|| DispatchError::NoRepository(site.identifier().to_string()))?;

        let web_url = self.codec.decode_for(url, site.languages())?;
        let uri = ResourceUri::new(site.identifier(), types::PAGE)
            .with_path(web_url.path().clone())
            .with_version(web_url.version());
        let not_found = || DispatchError::NotFound {
            site: site.identifier().to_string(),
            target: web_url.link(),
        };

        let revision = repository.revision(&uri)?.ok_or_else(not_found)?;
        let registry = self.codec.registry();
        let candidates: Vec<Arc<Language>> = revision
            .languages
            .iter()
            .filter_map(|code| registry.lookup(code))
            .collect();

        let language = match web_url.language() {
            Some(requested) if candidates.contains(requested) => Some(Arc::clone(requested)),
            _ => {
                let accept = accept_language
                    .map(parse_accept_language)
                    .unwrap_or_default();
                let original = revision.original.as_deref().and_then(|c| registry.lookup(c));
                let raw_path = raw_path(url);
                let segments = path_segments(&raw_path);
                site.default_language().and_then(|default| {
                    let choice = LanguageChoice::new(&candidates, default, site.languages())
                        .path_segments(&segments)
                        .accept_locales(&accept)
                        .original(original.as_deref());
                    self.languages.resolve(&choice)
                })
            }
        };
        debug!(
            "dispatch";
            "{} -> {} ({})",
            url,
            uri,
            language.as_ref().map_or("-", |l| l.identifier())
        );

        let resource = repository.get(&uri)?.ok_or_else(not_found)?;
        Ok(Dispatched {
            uri: resource.uri().clone(),
            site,
            url: web_url,
            language,
            resource,
        })
    }
}

/// Path part of an absolute url or request path.
fn raw_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{LocalizedContent, Version};
    use crate::language::LanguageRegistry;
    use crate::repository::{FileSystemContentRepository, RepositoryRoot};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        resolver: RequestResolver,
        repository: Arc<FileSystemContentRepository>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let registry = LanguageRegistry::shared();
        let manager = Arc::new(SiteManager::default());
        let site = Site::builder("demo")
            .hostname("www.demo.org")
            .languages(["en", "de", "fr"])
            .build(&registry)
            .unwrap();
        manager.add_site(Arc::new(site)).unwrap();

        let repository = Arc::new(FileSystemContentRepository::with_defaults(
            RepositoryRoot::new().with_override(dir.path()),
        ));
        manager
            .add_content_repository("demo", repository.clone())
            .unwrap();

        Fixture {
            _dir: dir,
            resolver: RequestResolver::new(manager, UrlCodec::new(registry)),
            repository,
        }
    }

    fn store(f: &Fixture, path: &str, version: Version, languages: &[&str], original: &str) {
        let registry = LanguageRegistry::shared();
        let uri = ResourceUri::new("demo", types::PAGE)
            .with_path(path)
            .with_version(version);
        let mut resource = Resource::new(uri);
        for code in languages {
            resource.add_content(
                LocalizedContent::new(registry.resolve(code).unwrap())
                    .with_title(*code)
                    .with_original(*code == original),
            );
        }
        f.repository.store(&resource).unwrap();
    }

    fn language(dispatched: &Dispatched) -> Option<&str> {
        dispatched.language.as_ref().map(|l| l.identifier())
    }

    #[test]
    fn test_header_language() {
        let f = fixture();
        store(&f, "/news", Version::Live, &["en", "de", "fr"], "de");

        let hit = f
            .resolver
            .resolve("http://www.demo.org/news/", Some("fr-CH, en;q=0.8"))
            .unwrap();
        assert_eq!(hit.site.identifier(), "demo");
        assert_eq!(language(&hit), Some("fr"));
        assert!(hit.uri.id().is_some());
    }

    #[test]
    fn test_original_then_default() {
        let f = fixture();
        store(&f, "/news", Version::Live, &["en", "de"], "de");
        store(&f, "/about", Version::Live, &["en", "fr"], "fr");

        let news = f.resolver.resolve("http://www.demo.org/news", None).unwrap();
        assert_eq!(language(&news), Some("de"));

        // header language the content lacks is ignored
        let about = f
            .resolver
            .resolve("http://www.demo.org/about", Some("de"))
            .unwrap();
        assert_eq!(language(&about), Some("fr"));
    }

    #[test]
    fn test_url_language_and_version() {
        let f = fixture();
        store(&f, "/news", Version::Live, &["en"], "en");
        store(&f, "/news", Version::Work, &["en", "de"], "en");

        let work = f
            .resolver
            .resolve("http://www.demo.org/news/work_de.html", Some("en"))
            .unwrap();
        assert_eq!(work.uri.version(), Version::Work);
        assert_eq!(language(&work), Some("de"));

        let segmented = f
            .resolver
            .resolve("http://www.demo.org/news/de/", None)
            .unwrap();
        assert_eq!(segmented.uri.version(), Version::Live);
        assert_eq!(language(&segmented), Some("en"));
    }

    #[test]
    fn test_percent_encoded_path() {
        let f = fixture();
        store(&f, "/über uns", Version::Live, &["de"], "de");

        let hit = f
            .resolver
            .resolve("http://www.demo.org/%C3%BCber%20uns/", None)
            .unwrap();
        assert_eq!(hit.url.path(), "/über uns/");
        assert_eq!(language(&hit), Some("de"));
    }

    #[test]
    fn test_failures() {
        let f = fixture();
        assert!(matches!(
            f.resolver.resolve("http://other.org/", None),
            Err(DispatchError::UnknownHost(host)) if host == "other.org"
        ));
        assert!(matches!(
            f.resolver.resolve("http://www.demo.org/missing", None),
            Err(DispatchError::NotFound { .. })
        ));

        store(&f, "/news", Version::Live, &["en"], "en");
        assert!(matches!(
            f.resolver.resolve("http://www.demo.org/news/3.html", None),
            Err(DispatchError::NotFound { .. })
        ));

        let site = f.resolver.sites().site("demo").unwrap();
        site.stop();
        assert!(matches!(
            f.resolver.resolve("http://www.demo.org/news", None),
            Err(DispatchError::Offline(_))
        ));
    }
}
