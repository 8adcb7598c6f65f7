//! Command-line interface definitions.

use crate::content::Version;
use crate::url::Flavor;
use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Weblounge content repository and site tools
#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: weblounge.toml)
    #[arg(short = 'C', long, default_value = "weblounge.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List configured sites with hostnames, languages and repository state
    #[command(visible_alias = "s")]
    Sites {
        /// Repository root directory (overrides `[repository] root`)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        root: Option<PathBuf>,
    },

    /// Rebuild site indexes from their repository trees
    #[command(visible_alias = "i")]
    Index {
        /// Sites to reindex (default: all)
        #[arg(value_name = "SITE")]
        sites: Vec<String>,

        /// Repository root directory (overrides `[repository] root`)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        root: Option<PathBuf>,
    },

    /// Resolve a request url to the stored resource it serves
    #[command(visible_alias = "r")]
    Resolve {
        /// Absolute request url, e.g. http://www.demo.org/news/work_de.html
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,

        /// Accept-Language header value
        #[arg(short = 'l', long = "accept-language")]
        accept_language: Option<String>,

        /// Repository root directory (overrides `[repository] root`)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        root: Option<PathBuf>,
    },

    /// Encode a resource reference into a url path
    Encode {
        /// Resource path, e.g. /news/
        path: String,

        /// Version: live, work or a revision number
        #[arg(long = "version", value_name = "VERSION", default_value = "live")]
        revision: Version,

        /// Language code
        #[arg(short, long)]
        language: Option<String>,

        /// Output flavor: html, xml or json
        #[arg(short, long, value_parser = parse_flavor, default_value = "html")]
        flavor: Flavor,
    },

    /// Decode a url path into path, version, language and flavor
    Decode {
        /// Url path or absolute url
        path: String,
    },
}

impl Commands {
    /// Whether the command needs a config file.
    pub const fn needs_config(&self) -> bool {
        matches!(
            self,
            Self::Sites { .. } | Self::Index { .. } | Self::Resolve { .. }
        )
    }
}

fn parse_flavor(value: &str) -> Result<Flavor, String> {
    Flavor::parse(value).ok_or_else(|| format!("unknown flavor `{value}` (html, xml, json)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_index() {
        let cli = Cli::try_parse_from(["weblounge", "-V", "index", "demo", "shop", "--root", "/srv"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Index { sites, root } => {
                assert_eq!(sites, ["demo", "shop"]);
                assert_eq!(root, Some(PathBuf::from("/srv")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_encode() {
        let cli = Cli::try_parse_from([
            "weblounge", "encode", "/test/", "--version", "17", "-l", "de", "-f", "json",
        ])
        .unwrap();
        assert!(!cli.command.needs_config());
        match cli.command {
            Commands::Encode {
                path,
                revision,
                language,
                flavor,
            } => {
                assert_eq!(path, "/test/");
                assert_eq!(revision, Version::Revision(17));
                assert_eq!(language.as_deref(), Some("de"));
                assert_eq!(flavor, Flavor::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }

        assert!(Cli::try_parse_from(["weblounge", "encode", "/", "-f", "pdf"]).is_err());
    }
}
