//! `encode` and `decode` commands.

use crate::content::Version;
use crate::language::LanguageRegistry;
use crate::url::{Flavor, ResourcePath, UrlCodec, WebUrl};
use anyhow::Result;

pub fn encode(path: &str, version: Version, language: Option<&str>, flavor: Flavor) -> Result<()> {
    let language = language
        .map(|code| LanguageRegistry::shared().resolve(code))
        .transpose()?;
    let url = WebUrl::new(ResourcePath::new(path))
        .with_version(version)
        .with_language(language)
        .with_flavor(flavor);
    println!("{}", UrlCodec::default().encode(&url));
    Ok(())
}

pub fn decode(path: &str) -> Result<()> {
    let url = UrlCodec::default().decode(path)?;
    println!("path     {}", url.path());
    println!("version  {}", url.version());
    println!(
        "language {}",
        url.language().map_or("-", |l| l.identifier())
    );
    println!("flavor   {}", url.flavor());
    Ok(())
}
