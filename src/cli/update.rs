//! Run one check-and-update cycle.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::TargetArgs;
use crate::updater::UpdateOutcome;

/// Download and install the newest release when it is newer than the
/// installed one.
///
/// # Examples
///
/// ```bash
/// bundle-updater update --bundle /Applications/Widget.app --current-version 1.0.0
/// bundle-updater update --no-relaunch
/// ```
#[derive(Args, Debug)]
pub struct UpdateCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Do not start the new executable after installing.
    #[arg(long)]
    no_relaunch: bool,
}

impl UpdateCommand {
    /// Run the update.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let mut config = crate::config::UpdaterConfig::load_with_optional(config_path).await?;
        if self.no_relaunch {
            config.relaunch = false;
        }
        let updater = self.target.updater_with(config)?;

        match updater.check_and_update().await {
            UpdateOutcome::NoUpdateAvailable => {
                println!("{}", "Already up to date".green());
                Ok(())
            }
            UpdateOutcome::UpdateInstalled {
                version,
                executable,
            } => {
                println!("{} {}", "Installed".green().bold(), version);
                println!("Executable: {}", executable.display());
                Ok(())
            }
            UpdateOutcome::UpdateFailed(e) => Err(e.into()),
        }
    }
}
