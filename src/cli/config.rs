//! Manage the updater configuration file.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::UpdaterConfig;

/// Show or create the configuration file.
///
/// # Examples
///
/// ```bash
/// bundle-updater config                       # Same as `config show`
/// bundle-updater config init https://api.github.com/repos/acme/widget/releases
/// bundle-updater --config ./widget.toml config init https://example.com/feed.json --force
/// ```
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Display the effective configuration.
    ///
    /// This is the default when no subcommand is given.
    Show,

    /// Write a new configuration file.
    Init {
        /// Release feed URL.
        feed_url: String,

        /// Installed version to record.
        #[arg(long)]
        current_version: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file location.
    Path,
}

impl ConfigCommand {
    /// Run the subcommand.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(config_path).await,
            Some(ConfigSubcommands::Init {
                feed_url,
                current_version,
                force,
            }) => Self::init(config_path, feed_url, current_version, force).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", UpdaterConfig::resolve_path(config_path)?.display());
                Ok(())
            }
        }
    }

    async fn show(config_path: Option<PathBuf>) -> Result<()> {
        let path = UpdaterConfig::resolve_path(config_path)?;
        if !path.exists() {
            println!("No configuration at {}", path.display());
            println!("\n{}", "Tip:".yellow());
            println!("  Run 'bundle-updater config init <FEED_URL>' to create one");
            return Ok(());
        }

        let config = UpdaterConfig::load_from(&path).await?;
        println!("{}", "Updater Configuration".bold());
        println!("Location: {}\n", path.display());
        println!("{}", toml::to_string_pretty(&config)?);
        Ok(())
    }

    async fn init(
        config_path: Option<PathBuf>,
        feed_url: String,
        current_version: Option<String>,
        force: bool,
    ) -> Result<()> {
        let path = UpdaterConfig::resolve_path(config_path)?;
        if path.exists() && !force {
            bail!("Configuration already exists at {} (use --force to overwrite)", path.display());
        }

        let mut config = UpdaterConfig::new(feed_url);
        config.current_version = current_version;
        config.validate()?;
        config.save_to(&path).await?;

        println!("{} {}", "Created configuration at".green(), path.display());
        println!("\n{}", toml::to_string_pretty(&config)?);
        Ok(())
    }
}
