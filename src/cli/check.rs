//! Check the release feed without installing anything.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::TargetArgs;
use crate::release::{find_platform_asset, is_newer};

/// Show the newest release on the configured channel.
///
/// # Examples
///
/// ```bash
/// bundle-updater check --bundle /Applications/Widget.app --current-version 1.0.0
/// bundle-updater check --prerelease
/// ```
#[derive(Args, Debug)]
pub struct CheckCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Print the selected release as JSON.
    #[arg(long)]
    json: bool,
}

impl CheckCommand {
    /// Run the check.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let updater = self.target.updater(config_path).await?;
        let Some(release) = updater.latest_release().await? else {
            if self.json {
                println!("null");
            } else {
                println!("{}", "No release available on this channel".yellow());
            }
            return Ok(());
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&release)?);
            return Ok(());
        }

        println!("Latest release: {} ({})", release.tag_name.bold(), release.version());
        let config = updater.config();
        if let Ok(current) = config.current_version() {
            if is_newer(&release, &current) {
                println!("{}", format!("Update available: {current} -> {}", release.version()).green());
            } else {
                println!("Up to date ({current})");
            }
        }

        match find_platform_asset(&release, &config.asset_suffix) {
            Some(asset) => println!("Asset: {} ({} bytes, {})", asset.name, asset.size, asset.content_type),
            None => println!(
                "{}",
                format!("No asset ending in '{}'", config.asset_suffix).yellow()
            ),
        }

        if !release.body.trim().is_empty() {
            println!("\n{}", release.body.trim());
        }
        Ok(())
    }
}
