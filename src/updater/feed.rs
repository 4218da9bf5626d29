//! Release feed retrieval.

use crate::constants::{MAX_BACKOFF_DELAY, STARTING_BACKOFF_DELAY_MS};
use crate::core::{Result, UpdaterError};
use crate::release::{Release, parse_feed};
use reqwest::{Client, StatusCode, Url};
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

/// Fetches and parses the release feed.
///
/// Transport errors and 5xx responses are retried with exponential backoff;
/// any other status and any decoding failure are returned immediately.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    url: Url,
    retries: usize,
}

impl FeedClient {
    /// Create a client for `url` retrying up to `retries` times.
    pub fn new(client: Client, url: Url, retries: usize) -> Self {
        Self {
            client,
            url,
            retries,
        }
    }

    /// Feed URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the feed and parse it into releases.
    ///
    /// # Errors
    ///
    /// - [`UpdaterError::Network`] or [`UpdaterError::HttpStatus`] when the
    ///   request fails after retries
    /// - [`UpdaterError::Decoding`] when the body is not a release array
    pub async fn fetch(&self) -> Result<Vec<Release>> {
        // 200ms, 400ms, 800ms, ... capped
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(STARTING_BACKOFF_DELAY_MS / 2)
            .max_delay(MAX_BACKOFF_DELAY)
            .take(self.retries);

        let body = RetryIf::spawn(
            strategy,
            || self.fetch_once(),
            |e: &UpdaterError| {
                let transient = e.is_transient();
                if transient {
                    warn!("Feed request failed, retrying: {}", e);
                }
                transient
            },
        )
        .await?;

        let releases = parse_feed(&body)?;
        debug!("Feed {} listed {} releases", self.url, releases.len());
        Ok(releases)
    }

    async fn fetch_once(&self) -> Result<Vec<u8>> {
        debug!("Fetching release feed from {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| UpdaterError::network(self.url.as_str(), &e))?;

        if response.status() != StatusCode::OK {
            return Err(UpdaterError::HttpStatus {
                url: self.url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| UpdaterError::network(self.url.as_str(), &e))?;
        Ok(bytes.to_vec())
    }
}
