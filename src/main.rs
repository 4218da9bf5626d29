//! bundle-updater CLI entry point
//!
//! Parses the command line, runs the command, and prints failures with a
//! suggestion where one is known.

use anyhow::Result;
use bundle_updater::cli;
use bundle_updater::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
