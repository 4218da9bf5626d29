//! Replacing the installed bundle.
//!
//! The swap never leaves the install location empty for longer than two
//! renames within one directory:
//!
//! ```text
//! 0. .Widget.app.previous    -> Applications/Widget.app            (only if Widget.app is missing)
//! 1. scratch/Widget.app      -> Applications/.Widget.app.staging   (move, may copy)
//! 2. Applications/Widget.app -> Applications/.Widget.app.previous  (rename)
//! 3. .Widget.app.staging     -> Applications/Widget.app            (rename)
//!    on failure: .Widget.app.previous -> Widget.app                (restore)
//! 4. remove .Widget.app.previous
//! ```

use crate::core::{Result, UpdaterError};
use crate::utils::fs::{move_dir, remove_dir_best_effort, remove_path};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Hidden sibling of `installed` with the given suffix.
fn sibling(installed: &Path, suffix: &str) -> Result<PathBuf> {
    let name = installed.file_name().ok_or_else(|| UpdaterError::BadInput {
        message: format!("bundle path {} has no file name", installed.display()),
    })?;
    Ok(installed.with_file_name(format!(".{}.{suffix}", name.to_string_lossy())))
}

/// Staging location used for the incoming bundle.
pub fn staging_path(installed: &Path) -> Result<PathBuf> {
    sibling(installed, "staging")
}

/// Location the outgoing bundle is parked at during the swap.
pub fn previous_path(installed: &Path) -> Result<PathBuf> {
    sibling(installed, "previous")
}

/// Replace `installed` with `downloaded`.
///
/// Runs on the blocking pool since it is a sequence of synchronous
/// filesystem calls.
///
/// # Errors
///
/// Returns [`UpdaterError::InvalidDownloadedBundle`] when the new bundle
/// cannot be staged or moved into place. In both cases the installed bundle
/// is still at its original path.
pub async fn swap_bundle(downloaded: &Path, installed: &Path) -> Result<()> {
    let downloaded = downloaded.to_path_buf();
    let installed = installed.to_path_buf();
    tokio::task::spawn_blocking(move || swap_blocking(&downloaded, &installed)).await.map_err(
        |e| UpdaterError::FileSystemError {
            operation: "swap bundle".to_string(),
            path: String::new(),
            reason: e.to_string(),
        },
    )?
}

fn swap_blocking(downloaded: &Path, installed: &Path) -> Result<()> {
    swap_with(downloaded, installed, |from, to| fs::rename(from, to))
}

/// Bring back a bundle parked by a swap that stopped between steps 2 and 3,
/// then clear whatever is left at the previous path.
fn recover_previous(installed: &Path, previous: &Path) -> Result<()> {
    if !previous.exists() {
        return Ok(());
    }
    if !installed.exists() {
        warn!(
            "{} is missing; restoring it from {}",
            installed.display(),
            previous.display()
        );
        return fs::rename(previous, installed)
            .map_err(|e| UpdaterError::fs("restore interrupted swap", previous, &e));
    }
    remove_path(previous).map_err(|e| UpdaterError::fs("remove stale previous bundle", previous, &e))
}

fn swap_with<R>(downloaded: &Path, installed: &Path, rename: R) -> Result<()>
where
    R: Fn(&Path, &Path) -> std::io::Result<()>,
{
    let staging = staging_path(installed)?;
    let previous = previous_path(installed)?;

    recover_previous(installed, &previous)?;

    remove_path(&staging).map_err(|e| UpdaterError::fs("remove stale staging bundle", &staging, &e))?;
    move_dir(downloaded, &staging).map_err(|e| {
        remove_dir_best_effort(&staging);
        UpdaterError::invalid_bundle(
            downloaded,
            format!("failed to stage bundle at {}: {e}", staging.display()),
        )
    })?;
    debug!("Staged new bundle at {}", staging.display());

    if let Err(e) = rename(installed, &previous) {
        remove_dir_best_effort(&staging);
        return Err(UpdaterError::invalid_bundle(
            installed,
            format!("failed to move installed bundle aside to {}: {e}", previous.display()),
        ));
    }

    if let Err(e) = rename(&staging, installed) {
        error!(
            "Failed to move {} into {}: {}; restoring previous bundle",
            staging.display(),
            installed.display(),
            e
        );
        if let Err(restore_err) = rename(&previous, installed) {
            error!(
                "Failed to restore {} from {}: {}",
                installed.display(),
                previous.display(),
                restore_err
            );
        }
        remove_dir_best_effort(&staging);
        return Err(UpdaterError::invalid_bundle(
            downloaded,
            format!("failed to move bundle into {}: {e}", installed.display()),
        ));
    }

    remove_dir_best_effort(&previous);
    info!("Installed new bundle at {}", installed.display());
    Ok(())
}
