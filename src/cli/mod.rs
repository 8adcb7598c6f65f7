//! Command-line interface module.
//!
//! | Command   | Purpose                                          |
//! |-----------|--------------------------------------------------|
//! | `sites`   | List sites, hostnames, languages, index state    |
//! | `index`   | Rebuild site indexes with progress output        |
//! | `resolve` | Run the request dispatch for one url             |
//! | `encode`  | Print the url path of a resource reference       |
//! | `decode`  | Print the parts of a url path                    |

mod args;
mod codec;
mod index;
mod resolve;
mod sites;

pub use args::{Cli, Commands};

use crate::config::{SystemConfig, init_config};
use anyhow::Result;
use clap::ColorChoice;

/// Run a parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    crate::logger::set_verbose(cli.verbose);

    init_config(SystemConfig::load(cli)?);

    match &cli.command {
        Commands::Sites { root } => sites::list_sites(root.as_deref()),
        Commands::Index { sites, root } => index::index_sites(sites, root.as_deref()),
        Commands::Resolve {
            url,
            accept_language,
            root,
        } => resolve::resolve_url(url, accept_language.as_deref(), root.as_deref()),
        Commands::Encode {
            path,
            revision,
            language,
            flavor,
        } => codec::encode(path, *revision, language.as_deref(), *flavor),
        Commands::Decode { path } => codec::decode(path),
    }
}
