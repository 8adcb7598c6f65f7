//! `[[site]]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [[site]]
//! id = "demo"
//! hostnames = [
//!     "www.demo.org",
//!     "*.demo.org",
//!     { url = "staging.demo.org", environment = "staging" },
//! ]
//! languages = ["de", "en"]
//! default_language = "de"      # defaults to the first language
//! autostart = true
//!
//! [site.options]
//! "contentrepository.fs.root" = "/srv/demo-data"
//! editors = ["alice", "bob"]
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::language::LanguageRegistry;
use crate::site::{Environment, HostPattern, OptionValue, Site, SiteBuilder, SiteError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A hostname, bound to production unless an environment is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostnameEntry {
    Plain(String),
    Bound {
        url: String,
        #[serde(default)]
        environment: Environment,
    },
}

impl HostnameEntry {
    pub fn url(&self) -> &str {
        match self {
            Self::Plain(url) | Self::Bound { url, .. } => url,
        }
    }

    pub fn environment(&self) -> Environment {
        match self {
            Self::Plain(_) => Environment::Production,
            Self::Bound { environment, .. } => *environment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteEntry {
    pub id: String,
    pub hostnames: Vec<HostnameEntry>,
    pub languages: Vec<String>,
    pub default_language: Option<String>,
    pub autostart: bool,
    pub options: BTreeMap<String, OptionValue>,
}

impl Default for SiteEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            hostnames: Vec::new(),
            languages: Vec::new(),
            default_language: None,
            autostart: true,
            options: BTreeMap::new(),
        }
    }
}

impl SiteEntry {
    pub fn builder(&self) -> SiteBuilder {
        let mut builder = Site::builder(&self.id)
            .languages(self.languages.iter().cloned())
            .autostart(self.autostart)
            .options(self.options.clone().into_iter().collect());
        for hostname in &self.hostnames {
            builder = builder.hostname_in(hostname.url(), hostname.environment());
        }
        if let Some(default) = &self.default_language {
            builder = builder.default_language(default);
        }
        builder
    }

    pub fn build(&self, registry: &LanguageRegistry) -> Result<Site, SiteError> {
        self.builder().build(registry)
    }

    /// Check the entry at position `index` on its own.
    pub fn validate(&self, index: usize, registry: &LanguageRegistry, diag: &mut ConfigDiagnostics) {
        if self.id.is_empty() {
            diag.error_with_hint(
                FieldPath::site(index, "id"),
                "site identifier is missing",
                "add `id = \"my-site\"`",
            );
        } else if !self
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            diag.error_with_hint(
                FieldPath::site(index, "id"),
                format!("`{}` is not a valid site identifier", self.id),
                "use letters, digits, `-` and `_` only",
            );
        }

        for hostname in &self.hostnames {
            if let Err(e) = HostPattern::parse(hostname.url()) {
                diag.error(FieldPath::site(index, "hostnames"), e.to_string());
            }
        }
        if self.hostnames.is_empty() {
            diag.warn(
                FieldPath::site(index, "hostnames"),
                format!("site `{}` has no hostnames and can't be reached", self.id),
            );
        }

        if self.languages.is_empty() {
            diag.error_with_hint(
                FieldPath::site(index, "languages"),
                "at least one language is required",
                "add `languages = [\"en\"]`",
            );
        }
        for code in &self.languages {
            if registry.lookup(code).is_none() {
                diag.error(
                    FieldPath::site(index, "languages"),
                    format!("unknown language `{code}`"),
                );
            }
        }

        if let Some(default) = &self.default_language {
            match registry.lookup(default) {
                None => diag.error(
                    FieldPath::site(index, "default_language"),
                    format!("unknown language `{default}`"),
                ),
                Some(language) => {
                    let listed = self
                        .languages
                        .iter()
                        .filter_map(|code| registry.lookup(code))
                        .any(|l| l == language);
                    if !listed {
                        diag.error_with_hint(
                            FieldPath::site(index, "default_language"),
                            format!("`{default}` is not one of the site languages"),
                            format!("add `{default}` to `languages`"),
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    const DEMO: &str = r#"
[[site]]
id = "demo"
hostnames = ["www.demo.org", { url = "staging.demo.org", environment = "staging" }]
languages = ["de", "en"]

[site.options]
single = "value"
list = ["a", "b"]
"#;

    #[test]
    fn test_site_entry() {
        let config = test_parse_config(DEMO);
        let site = &config.sites[0];

        assert_eq!(site.id, "demo");
        assert!(site.autostart);
        assert_eq!(site.hostnames[0].environment(), Environment::Production);
        assert_eq!(site.hostnames[1].url(), "staging.demo.org");
        assert_eq!(site.hostnames[1].environment(), Environment::Staging);
        assert_eq!(
            site.options.get("list"),
            Some(&OptionValue::Many(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_site_entry_builds_site() {
        let config = test_parse_config(DEMO);
        let site = config.sites[0].build(&LanguageRegistry::shared()).unwrap();

        assert_eq!(site.identifier(), "demo");
        assert_eq!(site.default_language().map(|l| l.identifier()), Some("de"));
        assert_eq!(site.hostnames_for(Environment::Staging).count(), 1);
        assert_eq!(site.options().value("single"), Some("value"));
        assert_eq!(site.options().values("list").len(), 2);
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let entry = SiteEntry {
            id: "bad id".into(),
            hostnames: vec![HostnameEntry::Plain("exa mple.com".into())],
            languages: vec!["en".into(), "xx".into()],
            default_language: Some("fr".into()),
            ..SiteEntry::default()
        };
        let mut diag = ConfigDiagnostics::new();
        entry.validate(0, &LanguageRegistry::shared(), &mut diag);

        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "site[0].id",
                "site[0].hostnames",
                "site[0].languages",
                "site[0].default_language"
            ]
        );
    }

    #[test]
    fn test_validate_missing_languages() {
        let entry = SiteEntry {
            id: "demo".into(),
            ..SiteEntry::default()
        };
        let mut diag = ConfigDiagnostics::new();
        entry.validate(3, &LanguageRegistry::shared(), &mut diag);

        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "site[3].languages");
        assert_eq!(diag.warnings().len(), 1);
    }
}
