//! Configuration management for the updater
//!
//! The updater is configured by a single TOML file. Embedding applications
//! usually build an [`UpdaterConfig`] in code instead and never touch the file;
//! the command line loads it from disk.
//!
//! # Location
//!
//! - Unix/macOS: `~/.bundle-updater/config.toml`
//! - Windows: `%LOCALAPPDATA%\bundle-updater\config.toml`
//! - Override: the `BUNDLE_UPDATER_CONFIG` environment variable or `--config`
//!
//! # Example
//!
//! ```toml
//! feed_url = "https://api.github.com/repos/acme/widget/releases"
//! current_version = "1.4.0"
//! allow_prereleases = false
//! single_instance_guard = true
//! check_interval = 86400
//! asset_suffix = ".zip"
//! bundle_extension = "app"
//! ```

mod updater;

pub use updater::UpdaterConfig;
