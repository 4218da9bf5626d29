//! Release feed model.
//!
//! A feed is a JSON array of releases in the GitHub releases API shape. Only
//! the fields the updater needs are modelled; any other fields are ignored,
//! but a missing or mistyped modelled field fails the whole parse.
//!
//! ```json
//! [
//!   {
//!     "tag_name": "v2.0.0",
//!     "prerelease": false,
//!     "body": "Release notes",
//!     "assets": [
//!       {
//!         "name": "Widget.zip",
//!         "size": 1048576,
//!         "content_type": "application/zip",
//!         "browser_download_url": "https://example.com/Widget.zip"
//!       }
//!     ]
//!   }
//! ]
//! ```

pub mod selector;

use crate::core::Result;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub use selector::{find_platform_asset, is_newer, select_update};

/// One published version of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Tag the release was published under, e.g. `v2.0.0`.
    pub tag_name: String,
    /// Whether the release is on the prerelease channel.
    pub prerelease: bool,
    /// Downloadable files, in feed order.
    pub assets: Vec<Asset>,
    /// Release notes.
    pub body: String,
}

impl Release {
    /// Semantic version derived from the tag.
    ///
    /// Tags that do not parse become `0.0.0`, so they never outrank a
    /// well-formed release.
    pub fn version(&self) -> Version {
        parse_tag_version(&self.tag_name)
    }
}

/// Parse a release tag as a semantic version, falling back to `0.0.0`.
///
/// A single leading `v` or `V` is accepted; everything after it must be a
/// strict semantic version.
///
/// ```rust
/// use bundle_updater::release::parse_tag_version;
/// use semver::Version;
///
/// assert_eq!(parse_tag_version("v1.2.3"), Version::new(1, 2, 3));
/// assert_eq!(parse_tag_version("nightly"), Version::new(0, 0, 0));
/// ```
pub fn parse_tag_version(tag: &str) -> Version {
    let trimmed = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    Version::parse(trimmed).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// File name shown in the feed.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// Archive flavour, classified from the declared MIME type.
    pub content_type: ContentType,
    /// Absolute download URL.
    #[serde(deserialize_with = "deserialize_url")]
    pub browser_download_url: String,
    /// Optional `sha256:<hex>` digest of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl Asset {
    /// Path component of the download URL.
    pub fn url_path(&self) -> String {
        reqwest::Url::parse(&self.browser_download_url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| self.browser_download_url.clone())
    }

    /// File name to store the download under, derived from the asset name.
    pub fn file_name(&self) -> String {
        std::path::Path::new(&self.name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty() && name != "." && name != "..")
            .unwrap_or_else(|| "download".to_string())
    }
}

fn deserialize_url<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    reqwest::Url::parse(&raw)
        .map_err(|e| serde::de::Error::custom(format!("invalid download URL '{raw}': {e}")))?;
    Ok(raw)
}

/// Archive flavour of an asset.
///
/// Classification is a fixed mapping from the declared MIME type. `Unknown`
/// is not an error; the installer treats it as a zip archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    /// `application/zip`
    Zip,
    /// `application/x-bzip2`, `application/x-xz`, or `application/x-gzip`
    Tar,
    /// Anything else
    Unknown,
}

impl ContentType {
    /// Classify a MIME type.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/x-bzip2" | "application/x-xz" | "application/x-gzip" => Self::Tar,
            "application/zip" => Self::Zip,
            _ => Self::Unknown,
        }
    }

    /// Canonical MIME type written when a feed is encoded.
    pub const fn as_mime(self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::Tar => "application/x-gzip",
            Self::Unknown => "application/octet-stream",
        }
    }
}

impl From<String> for ContentType {
    fn from(mime: String) -> Self {
        Self::from_mime(&mime)
    }
}

impl From<ContentType> for String {
    fn from(content_type: ContentType) -> Self {
        content_type.as_mime().to_string()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::Tar => write!(f, "tar"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Decode a feed body into releases, preserving feed order.
///
/// # Errors
///
/// Returns [`UpdaterError::Decoding`](crate::core::UpdaterError::Decoding)
/// when the body is not an array of well-formed releases.
pub fn parse_feed(body: &[u8]) -> Result<Vec<Release>> {
    Ok(serde_json::from_slice(body)?)
}
