//! Single-instance enforcement from the command line.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::TargetArgs;

/// Terminate the oldest other running instance, or list instances.
#[derive(Args, Debug)]
pub struct GuardCommand {
    #[command(flatten)]
    target: TargetArgs,

    /// Only list live instances.
    #[arg(long)]
    list: bool,
}

impl GuardCommand {
    /// Run the guard.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let updater = self.target.updater(config_path).await?;
        let registry = updater.instance_registry();

        if self.list {
            let live = registry.live_instances()?;
            println!("Registry: {}", registry.dir().display());
            if live.is_empty() {
                println!("No running instances");
            }
            for record in live {
                let started = chrono::DateTime::from_timestamp_millis(record.started_at)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| record.started_at.to_string());
                println!(
                    "  pid {:>7}  started {}  {}",
                    record.pid,
                    started,
                    record.executable.display()
                );
            }
            return Ok(());
        }

        match updater.enforce_single_instance()? {
            Some(_guard) => println!("{}", "Single-instance guard applied".green()),
            None => println!("{}", "Single-instance guard is disabled in the configuration".yellow()),
        }
        Ok(())
    }
}
