//! Archive extraction through external tools.
//!
//! Archives are unpacked in place: the tool runs with the archive's directory
//! as its working directory. The exit status is logged but not treated as
//! failure; whether a usable bundle came out is decided by the bundle scan
//! that follows.

use crate::constants::{TAR_TOOL, UNZIP_TOOL};
use crate::core::{Result, UpdaterError};
use crate::release::ContentType;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Unpacks a downloaded archive next to itself.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Unpack `archive` into the directory that contains it.
    async fn extract(&self, archive: &Path, content_type: ContentType) -> Result<()>;
}

/// Extractor that shells out to `tar x f` or `unzip`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandExtractor;

impl CommandExtractor {
    /// Tool and leading arguments used for a content type.
    ///
    /// Unknown content types are treated as zip archives.
    pub const fn command_for(content_type: ContentType) -> (&'static str, &'static [&'static str]) {
        match content_type {
            ContentType::Tar => (TAR_TOOL, &["xf"]),
            ContentType::Zip | ContentType::Unknown => (UNZIP_TOOL, &[]),
        }
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    async fn extract(&self, archive: &Path, content_type: ContentType) -> Result<()> {
        let dir = archive
            .parent()
            .ok_or_else(|| UpdaterError::invalid_bundle(archive, "archive has no parent directory"))?;

        let (tool, args) = Self::command_for(content_type);
        let tool_path = which::which(tool).map_err(|_| UpdaterError::ToolNotFound {
            tool: tool.to_string(),
        })?;

        debug!("Extracting {} ({}) with {}", archive.display(), content_type, tool_path.display());

        let output = Command::new(&tool_path)
            .args(args)
            .arg(archive)
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| UpdaterError::fs(format!("run {tool}"), archive, &e))?;

        if !output.status.success() {
            warn!(
                "{} exited with {} while extracting {}: {}",
                tool,
                output.status,
                archive.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_selection() {
        assert_eq!(CommandExtractor::command_for(ContentType::Tar), ("tar", &["xf"][..]));
        assert_eq!(CommandExtractor::command_for(ContentType::Zip), ("unzip", &[][..]));
        assert_eq!(CommandExtractor::command_for(ContentType::Unknown), ("unzip", &[][..]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extracts_tar_archive_in_place() {
        if which::which("tar").is_err() {
            return;
        }

        let source = TempDir::new().unwrap();
        std::fs::create_dir_all(source.path().join("Widget.app/Contents/MacOS")).unwrap();
        std::fs::write(source.path().join("Widget.app/Contents/MacOS/Widget"), b"v2").unwrap();

        let scratch = TempDir::new().unwrap();
        let archive = scratch.path().join("Widget.tar.gz");
        let status = std::process::Command::new("tar")
            .arg("czf")
            .arg(&archive)
            .arg("Widget.app")
            .current_dir(source.path())
            .status()
            .unwrap();
        assert!(status.success());

        CommandExtractor.extract(&archive, ContentType::Tar).await.unwrap();

        let exe = scratch.path().join("Widget.app/Contents/MacOS/Widget");
        assert_eq!(std::fs::read(exe).unwrap(), b"v2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_corrupt_archive_is_not_an_error() {
        if which::which("tar").is_err() {
            return;
        }

        let scratch = TempDir::new().unwrap();
        let archive = scratch.path().join("broken.tar");
        std::fs::write(&archive, b"definitely not a tarball").unwrap();

        CommandExtractor.extract(&archive, ContentType::Tar).await.unwrap();
    }
}
