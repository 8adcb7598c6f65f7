//! Sites and the site manager.
//!
//! # Module Structure
//!
//! ```text
//! site/
//! ├── host       # Hostname, HostPattern, Environment
//! ├── options    # SiteOptions: key -> values
//! ├── manager/   # SiteManager: host lookup, lifecycle, repository binding
//! └── mod.rs     # Site, SiteBuilder, SiteError (this file)
//! ```

mod host;
mod manager;
mod options;

pub use host::{Environment, HostPattern, Hostname, host_of};
pub use manager::{SiteEvent, SiteListener, SiteManager};
pub use options::{OptionValue, SiteOptions};

use crate::language::{Language, LanguageError, LanguageRegistry, PreferredLanguageResolver};
use crate::repository::{ContentRepository, RepositoryError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("invalid hostname `{0}`")]
    InvalidHostname(String),

    #[error("hostname `{hostname}` is already bound to site `{owner}`")]
    HostnameTaken { hostname: String, owner: String },

    #[error("site `{0}` is already registered")]
    Duplicate(String),

    #[error("site `{0}` is not registered")]
    Unknown(String),

    #[error("site `{0}` already has a content repository")]
    RepositoryAlreadySet(String),

    #[error("site `{site}` is misconfigured: {reason}")]
    Misconfigured { site: String, reason: String },

    #[error(transparent)]
    Language(#[from] LanguageError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A tenant: hostnames, languages, options and at most one repository.
pub struct Site {
    identifier: String,
    hostnames: Vec<Hostname>,
    default_language: Option<Arc<Language>>,
    languages: Vec<Arc<Language>>,
    options: SiteOptions,
    autostart: bool,
    online: AtomicBool,
    repository: Mutex<Option<Arc<dyn ContentRepository>>>,
}

impl Site {
    pub fn builder(identifier: impl Into<String>) -> SiteBuilder {
        SiteBuilder::new(identifier)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn hostnames(&self) -> &[Hostname] {
        &self.hostnames
    }

    /// Hostnames served in `environment`.
    pub fn hostnames_for(&self, environment: Environment) -> impl Iterator<Item = &Hostname> {
        self.hostnames
            .iter()
            .filter(move |h| h.environment() == environment)
    }

    pub fn default_language(&self) -> Option<&Arc<Language>> {
        self.default_language.as_ref()
    }

    /// Supported languages in configured order.
    pub fn languages(&self) -> &[Arc<Language>] {
        &self.languages
    }

    pub fn supports_language(&self, language: &Language) -> bool {
        self.languages.iter().any(|l| l.as_ref() == language)
    }

    /// Best site language for an `Accept-Language` header.
    pub fn preferred_language(
        &self,
        resolver: &PreferredLanguageResolver,
        accept_locales: &[String],
    ) -> Option<Arc<Language>> {
        let default = self.default_language.as_ref()?;
        Some(resolver.preferred_site_language(accept_locales, default, &self.languages))
    }

    pub fn options(&self) -> &SiteOptions {
        &self.options
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bring the site online.
    pub fn start(&self) -> Result<(), SiteError> {
        if self.languages.is_empty() {
            return Err(self.misconfigured("no languages configured"));
        }
        if let Some(default) = &self.default_language
            && !self.supports_language(default)
        {
            return Err(self.misconfigured(format!(
                "default language `{default}` is not a site language"
            )));
        }
        self.online.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn stop(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn misconfigured(&self, reason: impl Into<String>) -> SiteError {
        SiteError::Misconfigured {
            site: self.identifier.clone(),
            reason: reason.into(),
        }
    }

    // ========================================================================
    // Repository
    // ========================================================================

    /// Connect `repository` and attach it to this site.
    ///
    /// Rejected while another repository is attached.
    pub fn set_content_repository(
        &self,
        repository: Arc<dyn ContentRepository>,
    ) -> Result<(), SiteError> {
        let mut slot = self.repository.lock();
        if slot.is_some() {
            return Err(SiteError::RepositoryAlreadySet(self.identifier.clone()));
        }
        repository.connect(self)?;
        *slot = Some(repository);
        Ok(())
    }

    /// Detach and disconnect the current repository.
    pub fn take_content_repository(
        &self,
    ) -> Result<Option<Arc<dyn ContentRepository>>, SiteError> {
        let Some(repository) = self.repository.lock().take() else {
            return Ok(None);
        };
        repository.disconnect()?;
        Ok(Some(repository))
    }

    pub fn content_repository(&self) -> Option<Arc<dyn ContentRepository>> {
        self.repository.lock().clone()
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("identifier", &self.identifier)
            .field("hostnames", &self.hostnames)
            .field("languages", &self.languages)
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

/// Builder for `Site`. Languages are resolved through a `LanguageRegistry`.
#[derive(Debug)]
pub struct SiteBuilder {
    identifier: String,
    hostnames: Vec<(String, Environment)>,
    languages: Vec<String>,
    default_language: Option<String>,
    options: SiteOptions,
    autostart: bool,
}

impl SiteBuilder {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            hostnames: Vec::new(),
            languages: Vec::new(),
            default_language: None,
            options: SiteOptions::default(),
            autostart: true,
        }
    }

    /// Production hostname.
    pub fn hostname(self, hostname: impl Into<String>) -> Self {
        self.hostname_in(hostname, Environment::Production)
    }

    pub fn hostname_in(mut self, hostname: impl Into<String>, environment: Environment) -> Self {
        self.hostnames.push((hostname.into(), environment));
        self
    }

    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.languages.push(code.into());
        self
    }

    pub fn languages<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Defaults to the first language.
    pub fn default_language(mut self, code: impl Into<String>) -> Self {
        self.default_language = Some(code.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.add(key, value);
        self
    }

    pub fn options(mut self, options: SiteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn build(self, registry: &LanguageRegistry) -> Result<Site, SiteError> {
        let hostnames = self
            .hostnames
            .iter()
            .map(|(raw, environment)| Hostname::new(raw, *environment))
            .collect::<Result<Vec<_>, _>>()?;

        let mut languages: Vec<Arc<Language>> = Vec::with_capacity(self.languages.len());
        for code in &self.languages {
            let language = registry.resolve(code)?;
            if !languages.contains(&language) {
                languages.push(language);
            }
        }

        let default_language = match &self.default_language {
            Some(code) => Some(registry.resolve(code)?),
            None => languages.first().cloned(),
        };

        Ok(Site {
            identifier: self.identifier,
            hostnames,
            default_language,
            languages,
            options: self.options,
            autostart: self.autostart,
            online: AtomicBool::new(false),
            repository: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<LanguageRegistry> {
        LanguageRegistry::shared()
    }

    #[test]
    fn test_builder_resolves_languages() {
        let site = Site::builder("demo")
            .hostname("www.demo.org")
            .hostname_in("demo.local", Environment::Development)
            .languages(["de", "en", "deu"])
            .build(&registry())
            .unwrap();

        assert_eq!(site.identifier(), "demo");
        assert_eq!(site.languages().len(), 2);
        assert_eq!(site.default_language().map(|l| l.identifier()), Some("de"));
        assert_eq!(site.hostnames_for(Environment::Production).count(), 1);
        assert_eq!(site.hostnames_for(Environment::Staging).count(), 0);
        assert!(site.autostart());
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(matches!(
            Site::builder("demo").language("xx").build(&registry()),
            Err(SiteError::Language(_))
        ));
        assert!(matches!(
            Site::builder("demo").hostname("bad host").build(&registry()),
            Err(SiteError::InvalidHostname(_))
        ));
    }

    #[test]
    fn test_start_and_stop() {
        let site = Site::builder("demo")
            .languages(["en", "de"])
            .build(&registry())
            .unwrap();
        assert!(!site.is_online());
        site.start().unwrap();
        assert!(site.is_online());
        site.stop();
        assert!(!site.is_online());
    }

    #[test]
    fn test_start_requires_consistent_languages() {
        let empty = Site::builder("empty").build(&registry()).unwrap();
        assert!(matches!(empty.start(), Err(SiteError::Misconfigured { .. })));

        let odd = Site::builder("odd")
            .language("en")
            .default_language("fr")
            .build(&registry())
            .unwrap();
        assert!(odd.start().is_err());
        assert!(!odd.is_online());
    }

    #[test]
    fn test_preferred_language() {
        let site = Site::builder("demo")
            .languages(["en", "de"])
            .default_language("de")
            .build(&registry())
            .unwrap();
        let resolver = PreferredLanguageResolver::new(registry());

        let accept = vec!["fr".to_string(), "en".to_string()];
        assert_eq!(
            site.preferred_language(&resolver, &accept)
                .map(|l| l.identifier()),
            Some("en")
        );
        assert_eq!(
            site.preferred_language(&resolver, &[]).map(|l| l.identifier()),
            Some("de")
        );
    }
}
