//! Test utilities for bundle-updater
//!
//! Shared by unit tests and the integration suite (enabled there through the
//! `test-utils` feature):
//!
//! - [`fixtures`]: installed bundles on disk and release feeds
//! - [`fakes`]: in-memory implementations of the extractor, identity lookup
//!   and process control seams
//!
//! # Logging
//!
//! Tests are silent unless `RUST_LOG` is set or a level is passed:
//!
//! ```rust,ignore
//! bundle_updater::test_utils::init_test_logging(None);
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeExtractor, FakeIdentity, RecordingProcess};
pub use fixtures::{BundleFixture, asset, feed_json, release, write_bundle};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialise tracing for tests once per process.
///
/// With `Some(level)` that level is used; otherwise `RUST_LOG` is honoured,
/// and without either nothing is logged.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
