//! Keep checking in the foreground.

use anyhow::{Result, bail};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::common::TargetArgs;

/// Run the background scheduler until interrupted.
#[derive(Args, Debug)]
pub struct WatchCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Seconds between checks, overriding `check_interval`.
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,

    /// Also check once right away.
    #[arg(long)]
    now: bool,
}

impl WatchCommand {
    /// Run until Ctrl-C.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let mut config = crate::config::UpdaterConfig::load_with_optional(config_path).await?;
        if let Some(secs) = self.interval {
            config = config.with_check_interval(Duration::from_secs(secs));
        }
        let updater = Arc::new(self.target.updater_with(config)?);

        let _guard = updater.enforce_single_instance()?;
        if self.now {
            let outcome = updater.check_and_update().await;
            info!("Initial check: {}", outcome);
        }

        let Some(scheduler) = updater.spawn_scheduler() else {
            bail!("Scheduling is disabled (check_interval is 0)");
        };

        println!("Watching for updates every {}s, press Ctrl-C to stop", scheduler.interval().as_secs());
        tokio::signal::ctrl_c().await?;
        scheduler.stop();
        Ok(())
    }
}
