//! File system helpers for moving application bundles around.
//!
//! Bundles are directory trees that may contain symbolic links (framework
//! `Versions/Current` links, for example), so the copy helpers recreate links
//! instead of following them.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, recreating symbolic links.
///
/// `dst` must not exist yet.
///
/// # Examples
///
/// ```rust,no_run
/// use bundle_updater::utils::fs::copy_dir;
/// use std::path::Path;
///
/// # fn example() -> std::io::Result<()> {
/// copy_dir(Path::new("/tmp/scratch/Widget.app"), Path::new("/Applications/.Widget.app.staging"))?;
/// # Ok(())
/// # }
/// ```
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            // fs::copy preserves permission bits, which keeps executables executable
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}

/// Move a directory, falling back to copy-and-delete across volumes.
pub fn move_dir(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!("{} and {} are on different volumes, copying", src.display(), dst.display());
            if let Err(copy_err) = copy_dir(src, dst) {
                remove_dir_best_effort(dst);
                return Err(copy_err);
            }
            fs::remove_dir_all(src)
        }
        Err(e) => Err(e),
    }
}

fn is_cross_device(error: &io::Error) -> bool {
    #[cfg(unix)]
    {
        error.raw_os_error() == Some(libc::EXDEV)
    }
    #[cfg(windows)]
    {
        // ERROR_NOT_SAME_DEVICE
        error.raw_os_error() == Some(17)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = error;
        false
    }
}

/// Remove a file or directory tree if it exists.
pub fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Remove a path, logging instead of failing.
pub fn remove_dir_best_effort(path: &Path) {
    if let Err(e) = remove_path(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
