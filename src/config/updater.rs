//! Updater configuration file.
//!
//! The configuration is a TOML document. Every field except `feed_url` has a
//! default, so a minimal file is a single line:
//!
//! ```toml
//! feed_url = "https://api.github.com/repos/acme/widget/releases"
//! ```

use crate::constants::{
    CONFIG_ENV_VAR, DEFAULT_ASSET_SUFFIX, DEFAULT_BUNDLE_EXTENSION, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_FETCH_RETRIES, DEFAULT_IDENTITY_TOOL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::core::{Result, UpdaterError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Settings controlling how updates are discovered and installed.
///
/// # Examples
///
/// ```rust
/// use bundle_updater::config::UpdaterConfig;
///
/// let config = UpdaterConfig::new("https://example.com/releases.json")
///     .with_current_version("1.2.0")
///     .with_allow_prereleases(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// URL of the release feed (a JSON array of releases).
    pub feed_url: String,

    /// Version of the installed application. Required before checking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,

    /// Select prereleases instead of stable releases.
    #[serde(default)]
    pub allow_prereleases: bool,

    /// Enable [`Updater::enforce_single_instance`](crate::updater::Updater::enforce_single_instance).
    #[serde(default = "default_true")]
    pub single_instance_guard: bool,

    /// Seconds between scheduled checks. `0` disables the scheduler.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// Suffix the asset download URL must end with.
    #[serde(default = "default_asset_suffix")]
    pub asset_suffix: String,

    /// Directory extension of application bundles, without the dot.
    #[serde(default = "default_bundle_extension")]
    pub bundle_extension: String,

    /// Treat two unsigned bundles as matching identities.
    #[serde(default)]
    pub allow_unsigned: bool,

    /// Program used to read signing identities.
    #[serde(default = "default_identity_tool")]
    pub identity_tool: String,

    /// Relaunch the new executable and exit after a successful install.
    #[serde(default = "default_true")]
    pub relaunch: bool,

    /// Namespace of the running-instance registry. Defaults to the bundle name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Retries of the feed request after transient failures.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: usize,

    /// HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Parent directory for scratch directories. Defaults to the directory
    /// holding the installed bundle so the final move stays on one volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

const fn default_true() -> bool {
    true
}

const fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_asset_suffix() -> String {
    DEFAULT_ASSET_SUFFIX.to_string()
}

fn default_bundle_extension() -> String {
    DEFAULT_BUNDLE_EXTENSION.to_string()
}

fn default_identity_tool() -> String {
    DEFAULT_IDENTITY_TOOL.to_string()
}

const fn default_fetch_retries() -> usize {
    DEFAULT_FETCH_RETRIES
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl UpdaterConfig {
    /// Create a configuration with defaults for everything but the feed URL.
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            current_version: None,
            allow_prereleases: false,
            single_instance_guard: true,
            check_interval: default_check_interval(),
            asset_suffix: default_asset_suffix(),
            bundle_extension: default_bundle_extension(),
            allow_unsigned: false,
            identity_tool: default_identity_tool(),
            relaunch: true,
            app_id: None,
            fetch_retries: default_fetch_retries(),
            request_timeout: default_request_timeout(),
            scratch_dir: None,
        }
    }

    /// Set the installed version.
    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }

    /// Choose the prerelease channel.
    #[must_use]
    pub fn with_allow_prereleases(mut self, allow: bool) -> Self {
        self.allow_prereleases = allow;
        self
    }

    /// Enable or disable the single-instance guard.
    #[must_use]
    pub fn with_single_instance_guard(mut self, enabled: bool) -> Self {
        self.single_instance_guard = enabled;
        self
    }

    /// Set the recheck interval. A zero duration disables scheduling.
    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval.as_secs();
        self
    }

    /// Scheduler period, or `None` when scheduling is disabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.check_interval > 0).then(|| Duration::from_secs(self.check_interval))
    }

    /// HTTP timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Parse and return the feed URL.
    pub fn feed_url(&self) -> Result<reqwest::Url> {
        reqwest::Url::parse(&self.feed_url).map_err(|e| UpdaterError::BadInput {
            message: format!("feed_url '{}' is not a valid URL: {e}", self.feed_url),
        })
    }

    /// Parse and return the installed version.
    pub fn current_version(&self) -> Result<semver::Version> {
        let raw = self.current_version.as_deref().ok_or_else(|| UpdaterError::BadInput {
            message: "current_version is not set".to_string(),
        })?;
        let trimmed = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        semver::Version::parse(trimmed).map_err(|e| UpdaterError::BadInput {
            message: format!("current_version '{raw}' is not a semantic version: {e}"),
        })
    }

    /// Check every field that can be malformed.
    pub fn validate(&self) -> Result<()> {
        self.feed_url()?;
        if self.current_version.is_some() {
            self.current_version()?;
        }
        if self.bundle_extension.is_empty() || self.bundle_extension.starts_with('.') {
            return Err(UpdaterError::BadInput {
                message: format!(
                    "bundle_extension '{}' must be a non-empty extension without a leading dot",
                    self.bundle_extension
                ),
            });
        }
        if self.asset_suffix.is_empty() {
            return Err(UpdaterError::BadInput {
                message: "asset_suffix must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Load the configuration from `BUNDLE_UPDATER_CONFIG` or the default path.
    pub async fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::resolve_path(None)?).await
    }

    /// Load from an explicit path, falling back to the environment/default path.
    pub async fn load_with_optional(path: Option<PathBuf>) -> anyhow::Result<Self> {
        Self::load_from(&Self::resolve_path(path)?).await
    }

    /// Load from the given file.
    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read updater config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse updater config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize updater config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write updater config to {}", path.display()))?;

        Ok(())
    }

    /// Resolve the config path: explicit argument, then environment, then default.
    pub fn resolve_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        Self::default_path()
    }

    /// Platform default location of the configuration file.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("bundle-updater")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".bundle-updater")
        };

        Ok(config_dir.join("config.toml"))
    }
}
