//! Global constants used throughout the updater.
//!
//! Defaults for configuration fields, external tool names, and retry tuning
//! live here so the config layer, the CLI, and the tests agree on them.

use std::time::Duration;

/// Default interval between scheduled checks (24 hours, in seconds).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Suffix the download URL of an installable asset must end with.
pub const DEFAULT_ASSET_SUFFIX: &str = ".zip";

/// Directory extension that marks an application bundle.
pub const DEFAULT_BUNDLE_EXTENSION: &str = "app";

/// Tool used to read the signing identity of a bundle.
pub const DEFAULT_IDENTITY_TOOL: &str = "codesign";

/// Prefix of the line in the identity tool output that carries the authority.
pub const AUTHORITY_PREFIX: &str = "Authority=";

/// Archive tool used for tar flavoured assets.
pub const TAR_TOOL: &str = "tar";

/// Archive tool used for zip assets and unknown content types.
pub const UNZIP_TOOL: &str = "unzip";

/// Number of times a failed feed request is retried.
pub const DEFAULT_FETCH_RETRIES: usize = 3;

/// Default HTTP timeout in seconds, sized for large asset downloads.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Starting delay for exponential backoff between feed retries (200ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 200;

/// Maximum backoff delay between feed retries (5 seconds).
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(5);

/// Prefix of per-cycle scratch directories.
pub const SCRATCH_PREFIX: &str = ".bundle-updater-";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_ENV_VAR: &str = "BUNDLE_UPDATER_CONFIG";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("bundle-updater/", env!("CARGO_PKG_VERSION"));
