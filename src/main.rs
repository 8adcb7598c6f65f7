//! Weblounge - content repository and site tools.

use anyhow::Result;
use clap::Parser;
use weblounge::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::run(&cli)
}
