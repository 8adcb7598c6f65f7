//! `resolve` command: dispatch one request url.

use crate::config::cfg;
use crate::dispatch::RequestResolver;
use crate::language::LanguageRegistry;
use crate::log;
use crate::repository::FileSystemContentRepository;
use crate::site::SiteManager;
use crate::url::UrlCodec;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;

pub fn resolve_url(url: &str, accept_language: Option<&str>, root: Option<&Path>) -> Result<()> {
    let config = cfg();
    let registry = LanguageRegistry::shared();
    let manager = Arc::new(SiteManager::new(config.environment));
    let repository_root = config.repository_root(root);

    for entry in &config.sites {
        let repository = FileSystemContentRepository::with_defaults(repository_root.clone());
        manager.add_content_repository(&entry.id, Arc::new(repository))?;
        manager.add_site(Arc::new(entry.build(&registry)?))?;
    }

    let resolver = RequestResolver::new(Arc::clone(&manager), UrlCodec::new(registry));
    let result = resolver.resolve(url, accept_language);

    for site in manager.sites() {
        if let Err(e) = manager.remove_site(site.identifier()) {
            log!("error"; "{}", e);
        }
    }
    let hit = result?;

    println!("{}      {}", "site".bold(), hit.site.identifier());
    println!("{}  {}", "resource".bold(), hit.uri);
    println!("{}   {}", "version".bold(), hit.uri.version());
    println!("{}    {}", "flavor".bold(), hit.url.flavor());
    match &hit.language {
        Some(language) => {
            println!("{}  {} ({})", "language".bold(), language.identifier(), language.name());
            if let Some(title) = hit
                .resource
                .content(language)
                .and_then(|content| content.title())
            {
                println!("{}     {}", "title".bold(), title);
            }
        }
        None => println!("{}  -", "language".bold()),
    }
    Ok(())
}
