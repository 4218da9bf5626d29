//! Installed and downloaded application bundles.
//!
//! A bundle is a directory named `<Name>.<extension>` that contains the
//! application executable at a fixed relative path (for a macOS `.app`,
//! `Contents/MacOS/<Name>`). The installed bundle is found by walking up from
//! the running executable; a downloaded bundle is found by scanning the
//! directory an archive was unpacked into.

use crate::core::{Result, UpdaterError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// The application currently installed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBundle {
    root: PathBuf,
    executable: PathBuf,
}

impl InstalledBundle {
    /// Describe an installed bundle from its root and executable.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::BadInput`] when `executable` is not inside `root`.
    pub fn new(root: impl Into<PathBuf>, executable: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let executable = executable.into();
        if !executable.starts_with(&root) || executable == root {
            return Err(UpdaterError::BadInput {
                message: format!(
                    "executable {} is not inside bundle {}",
                    executable.display(),
                    root.display()
                ),
            });
        }
        Ok(Self {
            root,
            executable,
        })
    }

    /// Locate the bundle enclosing the running executable.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::MissingExecutablePath`] when the executable
    /// path is unavailable or not inside a bundle.
    pub fn current(extension: &str) -> Result<Self> {
        let exe = std::env::current_exe().map_err(|e| UpdaterError::MissingExecutablePath {
            reason: e.to_string(),
        })?;
        Self::from_executable(&exe, extension)
    }

    /// Locate the innermost bundle directory enclosing `executable`.
    pub fn from_executable(executable: &Path, extension: &str) -> Result<Self> {
        let root = executable
            .ancestors()
            .skip(1)
            .find(|ancestor| has_extension(ancestor, extension))
            .ok_or_else(|| UpdaterError::MissingExecutablePath {
                reason: format!(
                    "{} is not inside a .{} bundle",
                    executable.display(),
                    extension
                ),
            })?;

        Ok(Self {
            root: root.to_path_buf(),
            executable: executable.to_path_buf(),
        })
    }

    /// Bundle root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Executable path relative to the bundle root.
    pub fn relative_executable(&self) -> &Path {
        // Guaranteed by both constructors.
        self.executable.strip_prefix(&self.root).unwrap_or(&self.executable)
    }

    /// Bundle directory name without the extension, e.g. `Widget`.
    pub fn name(&self) -> String {
        self.root
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string())
    }

    /// Directory that holds the bundle.
    pub fn parent(&self) -> Result<&Path> {
        self.root.parent().ok_or_else(|| UpdaterError::BadInput {
            message: format!("bundle {} has no parent directory", self.root.display()),
        })
    }
}

/// A bundle freshly unpacked from a downloaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedBundle {
    root: PathBuf,
    executable: PathBuf,
}

impl DownloadedBundle {
    /// Open an unpacked bundle and check that its executable exists.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::InvalidDownloadedBundle`] when there is no
    /// regular file at `relative_executable` inside `root`.
    pub async fn open(root: &Path, relative_executable: &Path) -> Result<Self> {
        let executable = root.join(relative_executable);
        match fs::metadata(&executable).await {
            Ok(meta) if meta.is_file() => Ok(Self {
                root: root.to_path_buf(),
                executable,
            }),
            Ok(_) => Err(UpdaterError::invalid_bundle(
                root,
                format!("{} is not a file", relative_executable.display()),
            )),
            Err(e) => Err(UpdaterError::invalid_bundle(
                root,
                format!("executable {} is missing: {e}", relative_executable.display()),
            )),
        }
    }

    /// Bundle root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the executable inside the unpacked bundle.
    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

/// Find the single bundle directory among the immediate children of `dir`.
///
/// # Errors
///
/// Returns [`UpdaterError::InvalidDownloadedBundle`] when there is no bundle
/// directory or more than one.
pub async fn locate_bundle(dir: &Path, extension: &str) -> Result<PathBuf> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| UpdaterError::fs("read directory", dir, &e))?;

    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| UpdaterError::fs("read directory", dir, &e))?
    {
        let path = entry.path();
        if !has_extension(&path, extension) {
            continue;
        }
        let file_type =
            entry.file_type().await.map_err(|e| UpdaterError::fs("inspect entry", &path, &e))?;
        if file_type.is_dir() {
            found.push(path);
        }
    }

    match found.len() {
        0 => Err(UpdaterError::invalid_bundle(
            dir,
            format!("archive did not contain a .{extension} bundle"),
        )),
        1 => {
            let bundle = found.remove(0);
            debug!("Located unpacked bundle at {}", bundle.display());
            Ok(bundle)
        }
        n => {
            found.sort();
            let names: Vec<String> = found
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            Err(UpdaterError::invalid_bundle(
                dir,
                format!("archive contained {n} .{extension} bundles: {}", names.join(", ")),
            ))
        }
    }
}
