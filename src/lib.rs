//! bundle-updater - self-update engine for desktop application bundles
//!
//! The library checks a release feed (a JSON array of releases in the GitHub
//! releases API shape), decides whether a newer version of the installed
//! application exists, downloads the matching archive, verifies that the new
//! bundle is signed by the same authority as the installed one, swaps it into
//! place and relaunches the application.
//!
//! # Architecture Overview
//!
//! ```text
//! Updater ──▶ FeedClient ──▶ release::select_update ──▶ download_asset
//!                                                            │
//!                     relaunch ◀── swap ◀── identity ◀── extract + locate_bundle
//! ```
//!
//! # Core Modules
//!
//! - [`release`] - Release feed model and the update selector
//! - [`identity`] - Code-signing identity lookup and comparison
//! - [`installer`] - Unpacking, bundle discovery, staged swap and relaunch
//! - [`updater`] - The orchestrator, scheduler and single-instance guard
//!
//! ## Supporting Modules
//!
//! - [`config`] - TOML configuration file
//! - [`core`] - Error types and user-facing error formatting
//! - [`constants`] - Defaults shared across modules
//! - [`utils`] - Filesystem helpers
//! - [`cli`] - The `bundle-updater` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use bundle_updater::config::UpdaterConfig;
//! use bundle_updater::updater::Updater;
//!
//! # async fn example() -> bundle_updater::core::Result<()> {
//! let updater = Updater::new(
//!     UpdaterConfig::new("https://api.github.com/repos/acme/widget/releases")
//!         .with_current_version("1.0.0"),
//! )?;
//!
//! if let Some((release, asset)) = updater.available_update().await? {
//!     println!("{} is available as {}", release.tag_name, asset.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod identity;
pub mod installer;
pub mod release;
pub mod updater;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
