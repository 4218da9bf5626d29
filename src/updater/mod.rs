//! Update orchestration.
//!
//! [`Updater`] drives one check-and-update cycle end to end:
//!
//! ```text
//! 1. Feed
//!    ├── Resolve the installed bundle (MissingExecutablePath aborts)
//!    ├── GET the release feed, retrying transient failures
//!    └── Select the newest release on the configured channel
//!
//! 2. Decision
//!    ├── Selected version must be strictly newer than current_version
//!    └── Release must carry an asset whose URL ends with asset_suffix
//!
//! 3. Download
//!    ├── Create a private scratch directory next to the installed bundle
//!    ├── Stream the asset into it
//!    └── Verify size and digest when the feed declares them
//!
//! 4. Install
//!    ├── Unpack, locate and validate the bundle
//!    ├── Compare signing identities
//!    └── Staged swap into the installed location
//!
//! 5. Post-install
//!    ├── Remove the scratch directory
//!    └── Relaunch the new executable and terminate (when enabled)
//! ```
//!
//! # Error reporting
//!
//! [`Updater::latest_release`] and [`Updater::available_update`] return the
//! typed error of the feed phase. [`Updater::check_and_update`] never fails;
//! it returns an [`UpdateOutcome`] that carries the error when a cycle fails,
//! and logs it. Scheduled checks only log.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::config::UpdaterConfig;
//! use bundle_updater::updater::{UpdateOutcome, Updater};
//! use std::sync::Arc;
//!
//! # async fn example() -> bundle_updater::core::Result<()> {
//! let config = UpdaterConfig::new("https://api.github.com/repos/acme/widget/releases")
//!     .with_current_version(env!("CARGO_PKG_VERSION"));
//! let updater = Arc::new(Updater::new(config)?);
//!
//! let _instance = updater.enforce_single_instance()?;
//! let _scheduler = updater.spawn_scheduler();
//!
//! match updater.check_and_update().await {
//!     UpdateOutcome::UpdateInstalled { version, .. } => println!("Installed {version}"),
//!     UpdateOutcome::NoUpdateAvailable => println!("Up to date"),
//!     UpdateOutcome::UpdateFailed(e) => eprintln!("Update failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod download;
pub mod feed;
pub mod scheduler;
pub mod single_instance;
pub mod verification;

pub use feed::FeedClient;
pub use scheduler::Scheduler;
pub use single_instance::{InstanceGuard, InstanceRecord, InstanceRegistry, process_executable};

use crate::config::UpdaterConfig;
use crate::constants::{SCRATCH_PREFIX, USER_AGENT};
use crate::core::{Result, UpdaterError};
use crate::identity::{CodesignLookup, IdentityLookup, IdentityValidator};
use crate::installer::{
    ArchiveInstaller, CommandExtractor, Extractor, InstalledBundle, ProcessControl, SystemProcess,
};
use crate::release::{Asset, Release, find_platform_asset, is_newer, select_update};
use reqwest::Client;
use semver::Version;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};
use verification::ChecksumVerifier;

/// Result of one check-and-update cycle.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Nothing newer on the configured channel, or no installable asset.
    NoUpdateAvailable,
    /// An update was attempted and failed; the installed bundle is intact
    /// unless the error says otherwise.
    UpdateFailed(UpdaterError),
    /// A new bundle was installed.
    UpdateInstalled {
        /// Version that was installed.
        version: Version,
        /// Executable inside the new bundle.
        executable: PathBuf,
    },
}

impl UpdateOutcome {
    /// Whether a new bundle was installed.
    pub fn updated(&self) -> bool {
        matches!(self, Self::UpdateInstalled { .. })
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoUpdateAvailable => write!(f, "no update available"),
            Self::UpdateFailed(e) => write!(f, "update failed: {e}"),
            Self::UpdateInstalled {
                version,
                executable,
            } => write!(f, "installed {version} ({})", executable.display()),
        }
    }
}

/// Checks the release feed and installs newer bundles.
pub struct Updater {
    config: UpdaterConfig,
    client: Client,
    feed: FeedClient,
    installer: ArchiveInstaller,
    process: Arc<dyn ProcessControl>,
    installed: Option<InstalledBundle>,
    registry: Option<InstanceRegistry>,
}

impl Updater {
    /// Build an updater with the system collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::BadInput`] for a malformed configuration.
    pub fn new(config: UpdaterConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building an updater with replaceable collaborators.
    pub fn builder(config: UpdaterConfig) -> UpdaterBuilder {
        UpdaterBuilder::new(config)
    }

    /// Active configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// The installed bundle this updater replaces.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::MissingExecutablePath`] when none was given and
    /// the running executable is not inside a bundle.
    pub fn installed_bundle(&self) -> Result<InstalledBundle> {
        match &self.installed {
            Some(bundle) => Ok(bundle.clone()),
            None => InstalledBundle::current(&self.config.bundle_extension),
        }
    }

    /// Fetch the feed and return the newest release on the configured channel.
    ///
    /// This is the feed-only entry point: it never downloads or installs.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::MissingExecutablePath`] when the installed bundle is unknown
    /// - [`UpdaterError::Network`] / [`UpdaterError::HttpStatus`] for the feed request
    /// - [`UpdaterError::Decoding`] for a malformed feed
    pub async fn latest_release(&self) -> Result<Option<Release>> {
        self.installed_bundle()?;
        let releases = self.feed.fetch().await?;
        let selected = select_update(&releases, self.config.allow_prereleases).cloned();
        match &selected {
            Some(release) => debug!("Selected release {} ({})", release.tag_name, release.version()),
            None => debug!(
                "No release with assets on the {} channel",
                if self.config.allow_prereleases { "prerelease" } else { "stable" }
            ),
        }
        Ok(selected)
    }

    /// Return the release and asset that a cycle would install, if any.
    ///
    /// # Errors
    ///
    /// Everything [`Updater::latest_release`] returns, plus
    /// [`UpdaterError::BadInput`] when `current_version` is missing or malformed.
    pub async fn available_update(&self) -> Result<Option<(Release, Asset)>> {
        let current = self.config.current_version()?;
        let Some(release) = self.latest_release().await? else {
            return Ok(None);
        };

        if !is_newer(&release, &current) {
            info!("Current version {} is up to date (latest {})", current, release.version());
            return Ok(None);
        }

        let Some(asset) = find_platform_asset(&release, &self.config.asset_suffix) else {
            info!(
                "Release {} has no asset ending in '{}', skipping",
                release.tag_name, self.config.asset_suffix
            );
            return Ok(None);
        };

        let asset = asset.clone();
        Ok(Some((release, asset)))
    }

    /// Run one full check-and-update cycle.
    ///
    /// When an update is installed and `relaunch` is enabled, the new
    /// executable is started and the current process asked to terminate
    /// before this returns.
    pub async fn check_and_update(&self) -> UpdateOutcome {
        let outcome = match self.run_cycle().await {
            Ok(Some((version, executable))) => UpdateOutcome::UpdateInstalled {
                version,
                executable,
            },
            Ok(None) => UpdateOutcome::NoUpdateAvailable,
            Err(e) => {
                error!("Update check failed: {}", e);
                UpdateOutcome::UpdateFailed(e)
            }
        };

        if let UpdateOutcome::UpdateInstalled {
            version,
            executable,
        } = &outcome
        {
            info!("Updated to {}", version);
            if self.config.relaunch {
                if let Err(e) = self.installer.relaunch(executable) {
                    error!("Failed to relaunch {}: {}", executable.display(), e);
                }
            }
        }

        outcome
    }

    async fn run_cycle(&self) -> Result<Option<(Version, PathBuf)>> {
        let Some((release, asset)) = self.available_update().await? else {
            return Ok(None);
        };
        let installed = self.installed_bundle()?;
        info!("Updating {} to {}", installed.root().display(), release.tag_name);

        let scratch = self.scratch_dir(&installed)?;
        let archive = download::download_asset(&self.client, &asset, scratch.path()).await?;
        if let Some(digest) = &asset.digest {
            ChecksumVerifier::verify_checksum(&archive, digest, &asset.name).await?;
        }

        let executable = self.installer.install(&archive, asset.content_type, &installed).await?;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("Failed to remove scratch directory {}: {}", scratch_path.display(), e);
        }

        Ok(Some((release.version(), executable)))
    }

    fn scratch_dir(&self, installed: &InstalledBundle) -> Result<TempDir> {
        let parent = match &self.config.scratch_dir {
            Some(dir) => dir.clone(),
            None => installed.parent()?.to_path_buf(),
        };
        tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&parent)
            .map_err(|e| UpdaterError::fs("create scratch directory", &parent, &e))
    }

    /// Register this process and terminate the oldest other running instance.
    ///
    /// Returns `None` when the guard is disabled in the configuration. Keep
    /// the returned guard alive for as long as the application runs.
    pub fn enforce_single_instance(&self) -> Result<Option<InstanceGuard>> {
        if !self.config.single_instance_guard {
            debug!("Single-instance guard disabled");
            return Ok(None);
        }

        let registry = self.instance_registry();
        let guard = registry.register()?;
        if let Some(terminated) = registry.terminate_oldest_other(self.process.as_ref())? {
            info!("Terminated older instance with pid {}", terminated.pid);
        }
        Ok(Some(guard))
    }

    /// Registry of running instances of this application.
    pub fn instance_registry(&self) -> InstanceRegistry {
        if let Some(registry) = &self.registry {
            return registry.clone();
        }
        let app_id = self
            .config
            .app_id
            .clone()
            .or_else(|| self.installed.as_ref().map(InstalledBundle::name))
            .unwrap_or_else(|| "bundle-updater".to_string());
        InstanceRegistry::for_app(&app_id)
    }

    /// Start the recurring background check.
    ///
    /// Returns `None` when `check_interval` is zero. Must be called from
    /// within a tokio runtime.
    pub fn spawn_scheduler(self: &Arc<Self>) -> Option<Scheduler> {
        let interval = self.config.interval()?;
        info!("Checking for updates every {}s", interval.as_secs());

        let updater = Arc::clone(self);
        Some(Scheduler::spawn(interval, move || {
            let updater = Arc::clone(&updater);
            async move {
                let outcome = updater.check_and_update().await;
                debug!("Scheduled check finished: {}", outcome);
            }
        }))
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("config", &self.config)
            .field("installer", &self.installer)
            .field("installed", &self.installed)
            .finish()
    }
}

/// Builder for [`Updater`].
///
/// Every collaborator defaults to the system implementation: `codesign` for
/// identities, `tar`/`unzip` for archives, OS processes, and the bundle
/// enclosing the running executable.
pub struct UpdaterBuilder {
    config: UpdaterConfig,
    identity_lookup: Option<Arc<dyn IdentityLookup>>,
    extractor: Option<Arc<dyn Extractor>>,
    process_control: Option<Arc<dyn ProcessControl>>,
    installed_bundle: Option<InstalledBundle>,
    http_client: Option<Client>,
    instance_registry: Option<InstanceRegistry>,
}

impl UpdaterBuilder {
    fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            identity_lookup: None,
            extractor: None,
            process_control: None,
            installed_bundle: None,
            http_client: None,
            instance_registry: None,
        }
    }

    /// Use a custom identity lookup.
    #[must_use]
    pub fn identity_lookup(mut self, lookup: Arc<dyn IdentityLookup>) -> Self {
        self.identity_lookup = Some(lookup);
        self
    }

    /// Use a custom archive extractor.
    #[must_use]
    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Use a custom process controller.
    #[must_use]
    pub fn process_control(mut self, process: Arc<dyn ProcessControl>) -> Self {
        self.process_control = Some(process);
        self
    }

    /// Update this bundle instead of the one enclosing the running executable.
    #[must_use]
    pub fn installed_bundle(mut self, bundle: InstalledBundle) -> Self {
        self.installed_bundle = Some(bundle);
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Keep instance markers in this registry.
    #[must_use]
    pub fn instance_registry(mut self, registry: InstanceRegistry) -> Self {
        self.instance_registry = Some(registry);
        self
    }

    /// Validate the configuration and assemble the updater.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::BadInput`] for a malformed configuration or an
    /// HTTP client that cannot be created.
    pub fn build(self) -> Result<Updater> {
        self.config.validate()?;
        let feed_url = self.config.feed_url()?;

        let client = match self.http_client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(USER_AGENT)
                .timeout(self.config.timeout())
                .build()
                .map_err(|e| UpdaterError::BadInput {
                    message: format!("failed to create HTTP client: {e}"),
                })?,
        };

        let lookup = self
            .identity_lookup
            .unwrap_or_else(|| Arc::new(CodesignLookup::new(&self.config.identity_tool)));
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(CommandExtractor));
        let process = self.process_control.unwrap_or_else(|| Arc::new(SystemProcess));

        let installed = match self.installed_bundle {
            Some(bundle) => Some(bundle),
            None => match InstalledBundle::current(&self.config.bundle_extension) {
                Ok(bundle) => Some(bundle),
                Err(e) => {
                    debug!("Installed bundle not resolved yet: {}", e);
                    None
                }
            },
        };

        let installer = ArchiveInstaller::new(
            extractor,
            IdentityValidator::new(lookup, self.config.allow_unsigned),
            Arc::clone(&process),
            self.config.bundle_extension.clone(),
        );

        Ok(Updater {
            feed: FeedClient::new(client.clone(), feed_url, self.config.fetch_retries),
            client,
            installer,
            process,
            installed,
            registry: self.instance_registry,
            config: self.config,
        })
    }
}
