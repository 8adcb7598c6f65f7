//! Weblounge core: multi-tenant site routing, localized resource urls and a
//! filesystem-backed content repository.
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── language/    # LanguageRegistry, PreferredLanguageResolver
//! ├── url/         # WebUrl, UrlCodec
//! ├── content/     # Resource, ResourceUri, Version, serializers
//! ├── repository/  # ContentRepositoryIndex, FileSystemContentRepository
//! ├── site/        # Site, SiteManager
//! ├── dispatch     # RequestResolver: host -> site -> url -> resource
//! ├── config/      # weblounge.toml
//! ├── cli/         # command line
//! ├── logger       # log!/debug! and progress output
//! └── utils/       # hashing, filesystem helpers
//! ```

pub mod cli;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod language;
pub mod logger;
pub mod repository;
pub mod site;
pub mod url;
pub mod utils;
