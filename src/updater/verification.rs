use crate::core::{Result, UpdaterError};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Verifies downloaded assets against the digest published in the feed.
///
/// Digests use the `sha256:<hex>` form GitHub publishes for release assets.
/// A bare hex string is accepted too, and comparison ignores case.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Compute the SHA256 digest of a file as `sha256:<hex>`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use bundle_updater::updater::verification::ChecksumVerifier;
    /// use std::path::Path;
    ///
    /// # async fn example() -> bundle_updater::core::Result<()> {
    /// let digest = ChecksumVerifier::compute_sha256(Path::new("/tmp/Widget.zip")).await?;
    /// println!("{digest}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let mut file =
            File::open(file_path).await.map_err(|e| UpdaterError::fs("open download", file_path, &e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; 64 * 1024];
        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| UpdaterError::fs("read download", file_path, &e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(format!("sha256:{:x}", hasher.finalize()))
    }

    /// Verify `file_path` against `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdaterError::ChecksumMismatch`] when the digests differ.
    pub async fn verify_checksum(file_path: &Path, expected: &str, asset_name: &str) -> Result<()> {
        info!("Verifying checksum for: {}", file_path.display());

        let actual = Self::compute_sha256(file_path).await?;
        if normalize(&actual) != normalize(expected) {
            return Err(UpdaterError::ChecksumMismatch {
                name: asset_name.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }

        info!("Checksum verification successful");
        Ok(())
    }
}

fn normalize(digest: &str) -> String {
    let digest = digest.trim();
    let hex = digest
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("sha256:"))
        .map_or(digest, |_| &digest[7..]);
    hex.to_ascii_lowercase()
}
