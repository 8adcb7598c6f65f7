//! `sites` command.

use crate::config::cfg;
use crate::language::LanguageRegistry;
use crate::log;
use crate::repository::ContentRepositoryIndex;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn list_sites(root: Option<&Path>) -> Result<()> {
    let config = cfg();
    if config.sites.is_empty() {
        log!("sites"; "no sites configured in {}", config.config_path.display());
        return Ok(());
    }

    let registry = LanguageRegistry::shared();
    let repository_root = config.repository_root(root);

    for entry in &config.sites {
        let site = entry.build(&registry)?;
        let default = site.default_language().map(|l| l.identifier());
        let languages: Vec<String> = site
            .languages()
            .iter()
            .map(|l| {
                if Some(l.identifier()) == default {
                    format!("{}*", l.identifier())
                } else {
                    l.identifier().to_string()
                }
            })
            .collect();

        println!("{}", site.identifier().bold());
        println!("  languages  {}", languages.join(", "));
        for hostname in site.hostnames() {
            let marker = if hostname.environment() == config.environment {
                ""
            } else {
                " (inactive)"
            };
            println!("  hostname   {hostname}{}", marker.dimmed());
        }
        if !site.autostart() {
            println!("  autostart  {}", "off".yellow());
        }

        let site_dir = repository_root.resolve(&site).join(site.identifier());
        let index_dir = site_dir.join("index");
        let state = if index_dir.is_dir() {
            let index = ContentRepositoryIndex::open(&index_dir)?;
            match index.index_version() {
                Some(_) => format!(
                    "{} resources, {} revisions",
                    index.resource_count(),
                    index.revision_count()
                ),
                None => "index outdated".yellow().to_string(),
            }
        } else {
            "not indexed".dimmed().to_string()
        };
        println!("  repository {} ({state})", site_dir.display());
    }
    Ok(())
}
