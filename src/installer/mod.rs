//! Archive installation.
//!
//! One [`ArchiveInstaller::install`] call takes a downloaded archive through
//! the install state machine:
//!
//! ```text
//! Downloaded ──extract──▶ Unpacked ──bundle scan + executable──▶ Validated ──swap──▶ Installed
//!                            │                     │
//!                            └──────────┬──────────┘
//!                                       ▼
//!                                   Rejected
//! ```
//!
//! The identity gate runs strictly before the swap, so a rejected bundle never
//! touches the installed copy.
//!
//! # Module Structure
//!
//! - [`bundle`]: installed/downloaded bundle descriptions and the directory scan
//! - [`extract`]: the [`Extractor`] seam and the `tar`/`unzip` implementation
//! - [`swap`]: the staged replacement of the installed bundle
//! - [`process`]: the [`ProcessControl`] seam used for relaunch and termination

pub mod bundle;
pub mod extract;
pub mod process;
pub mod swap;

pub use bundle::{DownloadedBundle, InstalledBundle, locate_bundle};
pub use extract::{CommandExtractor, Extractor};
pub use process::{ProcessControl, SystemProcess};
pub use swap::swap_bundle;

use crate::core::{Result, UpdaterError};
use crate::identity::IdentityValidator;
use crate::release::ContentType;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stage of one install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Archive is on disk in the scratch directory.
    Downloaded,
    /// Archive tool has run.
    Unpacked,
    /// A single bundle with its executable was found and its identity matches.
    Validated,
    /// The bundle replaced the installed copy.
    Installed,
    /// A gate failed; the installed copy is untouched.
    Rejected,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Downloaded => "downloaded",
            Self::Unpacked => "unpacked",
            Self::Validated => "validated",
            Self::Installed => "installed",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Unpacks, validates and swaps in a downloaded bundle.
pub struct ArchiveInstaller {
    extractor: Arc<dyn Extractor>,
    validator: IdentityValidator,
    process: Arc<dyn ProcessControl>,
    bundle_extension: String,
}

impl ArchiveInstaller {
    /// Create an installer from its collaborators.
    pub fn new(
        extractor: Arc<dyn Extractor>,
        validator: IdentityValidator,
        process: Arc<dyn ProcessControl>,
        bundle_extension: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            validator,
            process,
            bundle_extension: bundle_extension.into(),
        }
    }

    /// Install the bundle contained in `archive` over `installed`.
    ///
    /// `archive` must sit in a directory owned by the current attempt; the
    /// archive is unpacked next to itself and that directory is scanned for
    /// the bundle.
    ///
    /// Returns the executable path inside the freshly installed bundle, at the
    /// same relative offset the old executable had.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::InvalidDownloadedBundle`] when no single bundle or no
    ///   executable is found, or the bundle cannot be moved into place
    /// - [`UpdaterError::CodeSigningIdentityMismatch`] when the identities differ
    /// - [`UpdaterError::ToolNotFound`] when the archive tool is missing
    pub async fn install(
        &self,
        archive: &Path,
        content_type: ContentType,
        installed: &InstalledBundle,
    ) -> Result<PathBuf> {
        let mut stage = InstallStage::Downloaded;
        debug!("Install of {} {}", archive.display(), stage);

        match self.run_stages(archive, content_type, installed, &mut stage).await {
            Ok(executable) => {
                info!("Install of {} {}", archive.display(), InstallStage::Installed);
                Ok(executable)
            }
            Err(e) => {
                warn!(
                    "Install of {} {} after stage '{}': {}",
                    archive.display(),
                    InstallStage::Rejected,
                    stage,
                    e
                );
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        archive: &Path,
        content_type: ContentType,
        installed: &InstalledBundle,
        stage: &mut InstallStage,
    ) -> Result<PathBuf> {
        let scratch = archive
            .parent()
            .ok_or_else(|| UpdaterError::invalid_bundle(archive, "archive has no parent directory"))?;

        self.extractor.extract(archive, content_type).await?;
        *stage = InstallStage::Unpacked;

        let root = locate_bundle(scratch, &self.bundle_extension).await?;
        let relative = installed.relative_executable();
        let downloaded = DownloadedBundle::open(&root, relative).await?;
        self.validator.validate(downloaded.root(), installed.root()).await?;
        *stage = InstallStage::Validated;
        debug!("Bundle {} {}", downloaded.root().display(), stage);

        swap_bundle(downloaded.root(), installed.root()).await?;
        *stage = InstallStage::Installed;

        Ok(installed.root().join(relative))
    }

    /// Start `executable` and terminate the current process.
    pub fn relaunch(&self, executable: &Path) -> Result<()> {
        self.process.launch(executable)?;
        self.process.terminate_current();
        Ok(())
    }
}

impl fmt::Debug for ArchiveInstaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveInstaller")
            .field("validator", &self.validator)
            .field("bundle_extension", &self.bundle_extension)
            .finish()
    }
}
