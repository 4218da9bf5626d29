//! Code-signing identity validation.
//!
//! Before any destructive install step the downloaded bundle must be signed
//! by the same authority as the installed one. Identities are obtained from
//! an external tool through the [`IdentityLookup`] seam; the comparison
//! itself is the pure [`identities_match`] predicate.
//!
//! # Unsigned bundles
//!
//! A bundle whose identity cannot be read is "unsigned". Two unsigned bundles
//! only match when `allow_unsigned` is set; an unsigned bundle never matches a
//! signed one.

use crate::constants::AUTHORITY_PREFIX;
use crate::core::{Result, UpdaterError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Source of bundle signing identities.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Signing authority of the bundle at `bundle`, or `None` when unsigned or unreadable.
    async fn signing_identity(&self, bundle: &Path) -> Option<String>;
}

/// Reads identities with `codesign -dvvv <bundle>`.
#[derive(Debug, Clone)]
pub struct CodesignLookup {
    tool: PathBuf,
}

impl CodesignLookup {
    /// Use the given tool name or path.
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
        }
    }
}

impl Default for CodesignLookup {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_IDENTITY_TOOL)
    }
}

#[async_trait]
impl IdentityLookup for CodesignLookup {
    async fn signing_identity(&self, bundle: &Path) -> Option<String> {
        let tool = match which::which(&self.tool) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Identity tool {} not available: {}", self.tool.display(), e);
                return None;
            }
        };

        // codesign writes its verbose report to stderr
        let output = match Command::new(&tool)
            .arg("-dvvv")
            .arg(bundle)
            .stdin(Stdio::null())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {} on {}: {}", tool.display(), bundle.display(), e);
                return None;
            }
        };

        let mut report = String::from_utf8_lossy(&output.stdout).into_owned();
        report.push('\n');
        report.push_str(&String::from_utf8_lossy(&output.stderr));

        let identity = parse_authority(&report);
        debug!("Signing identity of {}: {:?}", bundle.display(), identity);
        identity
    }
}

/// Extract the first `Authority=` value from a verbose signing report.
///
/// ```rust
/// use bundle_updater::identity::parse_authority;
///
/// let report = "Identifier=com.acme.widget\nAuthority=Developer ID Application: Acme\nAuthority=Apple Root CA\n";
/// assert_eq!(parse_authority(report).as_deref(), Some("Developer ID Application: Acme"));
/// ```
pub fn parse_authority(report: &str) -> Option<String> {
    report
        .lines()
        .find_map(|line| line.strip_prefix(AUTHORITY_PREFIX))
        .map(|authority| authority.trim_end_matches('\r').to_string())
}

/// Compare two identities.
///
/// Present identities match when textually equal. Absent identities match
/// each other only when `allow_unsigned` is set.
pub fn identities_match(a: Option<&str>, b: Option<&str>, allow_unsigned: bool) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (None, None) => allow_unsigned,
        _ => false,
    }
}

/// Gate applied to a downloaded bundle before it may replace the installed one.
#[derive(Clone)]
pub struct IdentityValidator {
    lookup: Arc<dyn IdentityLookup>,
    allow_unsigned: bool,
}

impl IdentityValidator {
    /// Create a validator over the given lookup.
    pub fn new(lookup: Arc<dyn IdentityLookup>, allow_unsigned: bool) -> Self {
        Self {
            lookup,
            allow_unsigned,
        }
    }

    /// Whether both bundles carry the same signing identity.
    pub async fn bundles_match(&self, downloaded: &Path, installed: &Path) -> bool {
        self.validate(downloaded, installed).await.is_ok()
    }

    /// Fail with [`UpdaterError::CodeSigningIdentityMismatch`] unless both
    /// bundles carry the same signing identity.
    pub async fn validate(&self, downloaded: &Path, installed: &Path) -> Result<()> {
        let downloaded_identity = self.lookup.signing_identity(downloaded).await;
        let installed_identity = self.lookup.signing_identity(installed).await;

        if identities_match(
            downloaded_identity.as_deref(),
            installed_identity.as_deref(),
            self.allow_unsigned,
        ) {
            debug!("Signing identities match for {}", downloaded.display());
            return Ok(());
        }

        Err(UpdaterError::CodeSigningIdentityMismatch {
            installed: installed_identity.unwrap_or_else(|| "unsigned".to_string()),
            downloaded: downloaded_identity.unwrap_or_else(|| "unsigned".to_string()),
        })
    }
}

impl std::fmt::Debug for IdentityValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityValidator").field("allow_unsigned", &self.allow_unsigned).finish()
    }
}
