//! Error handling for the updater
//!
//! This module provides the typed error enum shared by every stage of the
//! update pipeline and the user-facing wrapper used by the command line.
//!
//! # Architecture
//!
//! - [`UpdaterError`] - Enumerated failure kinds for feed fetching, selection,
//!   download, extraction, identity validation, and installation
//! - [`ErrorContext`] - Wrapper that adds a suggestion and details for display
//!
//! # Propagation
//!
//! Feed fetch and feed parse failures propagate to callers of
//! [`Updater::latest_release`](crate::updater::Updater::latest_release).
//! Everything that happens after a release has been chosen is reported through
//! [`UpdateOutcome::UpdateFailed`](crate::updater::UpdateOutcome::UpdateFailed)
//! so scheduled checks never surface a panic or an unhandled error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::core::{UpdaterError, user_friendly_error};
//!
//! let error = UpdaterError::BadInput {
//!     message: "feed_url is not a valid URL".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Result alias used by the library.
pub type Result<T, E = UpdaterError> = std::result::Result<T, E>;

/// Failure kinds of the update pipeline.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The running executable, or the bundle enclosing it, could not be located.
    #[error("Cannot locate the running executable: {reason}")]
    MissingExecutablePath {
        /// Why the lookup failed
        reason: String,
    },

    /// Extraction produced no usable bundle, the bundle lacks its executable,
    /// or moving it into place failed.
    #[error("Invalid downloaded bundle at {path}: {reason}")]
    InvalidDownloadedBundle {
        /// Path of the archive, scratch directory, or bundle at fault
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// The downloaded bundle is not signed by the same authority as the installed one.
    #[error(
        "Code signing identity mismatch: installed bundle is signed by {installed}, downloaded bundle by {downloaded}"
    )]
    CodeSigningIdentityMismatch {
        /// Authority of the installed bundle, or `unsigned`
        installed: String,
        /// Authority of the downloaded bundle, or `unsigned`
        downloaded: String,
    },

    /// Malformed configuration or caller input.
    #[error("Bad input: {message}")]
    BadInput {
        /// Description of the offending value
        message: String,
    },

    /// The release feed did not have the expected shape.
    #[error("Failed to decode release feed: {0}")]
    Decoding(#[from] serde_json::Error),

    /// A request could not be completed at the transport level.
    #[error("Network error while requesting {url}: {reason}")]
    Network {
        /// Requested URL
        url: String,
        /// Underlying transport message
        reason: String,
    },

    /// The server answered with a status other than 200.
    #[error("Request to {url} returned HTTP status {status}")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code returned
        status: u16,
    },

    /// The response body ended before the declared asset size was received.
    #[error("Incomplete download from {url}: expected {expected} bytes, received {actual}")]
    IncompleteDownload {
        /// Asset URL
        url: String,
        /// Size declared by the feed
        expected: u64,
        /// Bytes written to disk
        actual: u64,
    },

    /// The downloaded asset does not match the digest published in the feed.
    #[error("Checksum mismatch for asset '{name}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Asset name
        name: String,
        /// Digest published in the feed
        expected: String,
        /// Digest of the downloaded file
        actual: String,
    },

    /// An external tool could not be found on this system.
    #[error("Required tool '{tool}' was not found")]
    ToolNotFound {
        /// Tool name or path
        tool: String,
    },

    /// A filesystem operation failed.
    #[error("File system error: {operation} ({path}): {reason}")]
    FileSystemError {
        /// The operation that failed
        operation: String,
        /// Path involved
        path: String,
        /// Underlying message
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl UpdaterError {
    /// Build a [`UpdaterError::FileSystemError`] from an IO error.
    pub fn fs(
        operation: impl Into<String>,
        path: &std::path::Path,
        error: &std::io::Error,
    ) -> Self {
        Self::FileSystemError {
            operation: operation.into(),
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    }

    /// Build a [`UpdaterError::InvalidDownloadedBundle`].
    pub fn invalid_bundle(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::InvalidDownloadedBundle {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`UpdaterError::Network`] from a transport error.
    pub fn network(url: impl Into<String>, error: &reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            reason: error.to_string(),
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network {
                ..
            } => true,
            Self::HttpStatus {
                status,
                ..
            } => *status >= 500,
            _ => false,
        }
    }
}

/// Error wrapper carrying a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// What the user can try next
    pub suggestion: Option<String>,
    /// Extra explanation of the failure
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without suggestion or details.
    #[must_use]
    pub const fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {:#}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let (suggestion, details) = match error.downcast_ref::<UpdaterError>() {
        Some(UpdaterError::MissingExecutablePath {
            ..
        }) => (
            "Run the updater from inside an installed application bundle, or set the bundle path explicitly",
            "The installed bundle is found by walking up from the running executable",
        ),
        Some(UpdaterError::BadInput {
            ..
        }) => (
            "Check feed_url and current_version in the configuration file",
            "Configuration values are validated before any network request is made",
        ),
        Some(UpdaterError::Decoding(_)) => (
            "Verify that the feed URL points at a JSON array of releases",
            "Each release needs tag_name, prerelease, assets, and body; each asset needs name, size, content_type, and browser_download_url",
        ),
        Some(UpdaterError::Network {
            ..
        })
        | Some(UpdaterError::HttpStatus {
            ..
        }) => (
            "Check your network connection and that the feed URL is reachable",
            "The feed request is retried a few times before giving up",
        ),
        Some(UpdaterError::CodeSigningIdentityMismatch {
            ..
        }) => (
            "Only install releases signed by the same publisher as the installed copy",
            "The installed bundle was left untouched",
        ),
        Some(UpdaterError::ToolNotFound {
            ..
        }) => (
            "Install the missing tool or point the configuration at its location",
            "Archives are unpacked with tar/unzip and identities are read with codesign",
        ),
        Some(UpdaterError::InvalidDownloadedBundle {
            ..
        }) => (
            "Make sure the release archive contains exactly one top-level application bundle",
            "The archive is scanned for a single directory with the bundle extension",
        ),
        _ => return ErrorContext::new(error),
    };

    ErrorContext::new(error).with_suggestion(suggestion).with_details(details)
}
