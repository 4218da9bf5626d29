//! Arguments and setup shared by the update commands.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::UpdaterConfig;
use crate::installer::InstalledBundle;
use crate::updater::Updater;

/// Which installed bundle to operate on and how to check it.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Root of the installed bundle, e.g. `/Applications/Widget.app`.
    ///
    /// Defaults to the bundle enclosing this executable.
    #[arg(long, value_name = "PATH")]
    pub bundle: Option<PathBuf>,

    /// Executable path relative to the bundle root.
    ///
    /// Defaults to `Contents/MacOS/<bundle name>`.
    #[arg(long, value_name = "PATH", requires = "bundle")]
    pub executable: Option<PathBuf>,

    /// Installed version, overriding `current_version` from the config file.
    #[arg(long, value_name = "VERSION")]
    pub current_version: Option<String>,

    /// Follow the prerelease channel instead of stable releases.
    #[arg(long)]
    pub prerelease: bool,
}

impl TargetArgs {
    /// Apply the overrides to a loaded configuration.
    pub fn apply(&self, mut config: UpdaterConfig) -> UpdaterConfig {
        if let Some(version) = &self.current_version {
            config.current_version = Some(version.clone());
        }
        if self.prerelease {
            config.allow_prereleases = true;
        }
        config
    }

    /// The installed bundle named on the command line, if any.
    pub fn installed_bundle(&self) -> Result<Option<InstalledBundle>> {
        let Some(root) = &self.bundle else {
            return Ok(None);
        };

        let executable = match &self.executable {
            Some(relative) => root.join(relative),
            None => {
                let name = root
                    .file_stem()
                    .with_context(|| format!("Bundle path {} has no name", root.display()))?;
                root.join("Contents").join("MacOS").join(name)
            }
        };

        let bundle = InstalledBundle::new(root, executable)?;
        Ok(Some(bundle))
    }

    /// Load the configuration and build an updater for the target bundle.
    pub async fn updater(&self, config_path: Option<PathBuf>) -> Result<Updater> {
        let config = UpdaterConfig::load_with_optional(config_path).await?;
        self.updater_with(config)
    }

    /// Build an updater for the target bundle from an already loaded config.
    pub fn updater_with(&self, config: UpdaterConfig) -> Result<Updater> {
        let mut builder = Updater::builder(self.apply(config));
        if let Some(bundle) = self.installed_bundle()? {
            builder = builder.installed_bundle(bundle);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_executable_path() {
        let args = TargetArgs {
            bundle: Some(PathBuf::from("/Applications/Widget.app")),
            ..TargetArgs::default()
        };
        let bundle = args.installed_bundle().unwrap().unwrap();
        assert_eq!(bundle.relative_executable(), Path::new("Contents/MacOS/Widget"));
    }

    #[test]
    fn test_explicit_executable_path() {
        let args = TargetArgs {
            bundle: Some(PathBuf::from("/opt/Widget.app")),
            executable: Some(PathBuf::from("bin/widget")),
            ..TargetArgs::default()
        };
        let bundle = args.installed_bundle().unwrap().unwrap();
        assert_eq!(bundle.executable(), Path::new("/opt/Widget.app/bin/widget"));
    }

    #[test]
    fn test_overrides() {
        let args = TargetArgs {
            current_version: Some("1.2.3".to_string()),
            prerelease: true,
            ..TargetArgs::default()
        };
        let config = args.apply(UpdaterConfig::new("https://example.com/releases.json"));
        assert_eq!(config.current_version.as_deref(), Some("1.2.3"));
        assert!(config.allow_prereleases);
    }
}
