//! Command-line interface for bundle-updater.
//!
//! The binary is a thin shell over the library: every command loads the
//! configuration file, applies command-line overrides, and drives an
//! [`Updater`](crate::updater::Updater).
//!
//! # Available Commands
//!
//! - `check` - Fetch the feed and show the release that would be installed
//! - `update` - Run one check-and-update cycle
//! - `watch` - Run the recurring check in the foreground
//! - `guard` - Enforce the single-instance rule, or list running instances
//! - `config` - Show or create the configuration file
//!
//! # Examples
//!
//! ```bash
//! bundle-updater config init https://api.github.com/repos/acme/widget/releases --current-version 1.0.0
//! bundle-updater check --bundle /Applications/Widget.app
//! bundle-updater -v update --bundle /Applications/Widget.app
//! bundle-updater watch --interval 3600 --now
//! ```
//!
//! # Logging
//!
//! Diagnostics go to stderr through `tracing`. `RUST_LOG` takes precedence;
//! otherwise `--verbose` selects `debug`, `--quiet` selects `error`, and the
//! default is `info`.

mod check;
mod common;
mod config;
mod guard;
mod update;
mod watch;

pub use common::TargetArgs;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(name = "bundle-updater", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file.
    ///
    /// Overrides `BUNDLE_UPDATER_CONFIG` and the default
    /// `~/.bundle-updater/config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the newest release on the configured channel without installing it.
    Check(check::CheckCommand),

    /// Download and install a newer release.
    Update(update::UpdateCommand),

    /// Keep checking at the configured interval until interrupted.
    Watch(watch::WatchCommand),

    /// Terminate the oldest other running instance.
    Guard(guard::GuardCommand),

    /// Manage the configuration file.
    Config(config::ConfigCommand),
}

impl Cli {
    /// Initialise logging and run the selected command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Check(cmd) => cmd.execute(self.config).await,
            Commands::Update(cmd) => cmd.execute(self.config).await,
            Commands::Watch(cmd) => cmd.execute(self.config).await,
            Commands::Guard(cmd) => cmd.execute(self.config).await,
            Commands::Config(cmd) => cmd.execute(self.config).await,
        }
    }

    /// Log filter selected by the flags when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(self.log_level())
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}
