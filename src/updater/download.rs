//! Asset download into the scratch directory.

use crate::core::{Result, UpdaterError};
use crate::release::Asset;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Stream `asset` into `dir` and return the path of the written file.
///
/// # Errors
///
/// - [`UpdaterError::HttpStatus`] for any status other than 200
/// - [`UpdaterError::Network`] when the transfer breaks off
/// - [`UpdaterError::IncompleteDownload`] when the asset declares a size and a
///   different number of bytes arrived
pub async fn download_asset(client: &Client, asset: &Asset, dir: &Path) -> Result<PathBuf> {
    let url = asset.browser_download_url.as_str();
    let destination = dir.join(asset.file_name());
    info!("Downloading {} to {}", url, destination.display());

    let mut response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/octet-stream")
        .send()
        .await
        .map_err(|e| UpdaterError::network(url, &e))?;

    if response.status() != StatusCode::OK {
        return Err(UpdaterError::HttpStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let mut file = File::create(&destination)
        .await
        .map_err(|e| UpdaterError::fs("create download file", &destination, &e))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(|e| UpdaterError::network(url, &e))? {
        file.write_all(&chunk)
            .await
            .map_err(|e| UpdaterError::fs("write download file", &destination, &e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| UpdaterError::fs("flush download file", &destination, &e))?;

    if asset.size > 0 && written != asset.size {
        return Err(UpdaterError::IncompleteDownload {
            url: url.to_string(),
            expected: asset.size,
            actual: written,
        });
    }

    debug!("Downloaded {} bytes from {}", written, url);
    Ok(destination)
}
