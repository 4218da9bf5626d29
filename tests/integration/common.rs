//! Shared setup for the integration tests.

use bundle_updater::config::UpdaterConfig;
use bundle_updater::release::Release;
use bundle_updater::test_utils::{
    BundleFixture, FakeExtractor, FakeIdentity, RecordingProcess, feed_json, init_test_logging,
};
use bundle_updater::updater::Updater;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FEED_PATH: &str = "/releases";
pub const APP: &str = "Widget";
pub const SIGNER: &str = "Developer ID Application: Acme Inc (ABCDE12345)";

/// Mock server plus an installed bundle and the fakes wired into an updater.
pub struct Harness {
    pub server: MockServer,
    pub bundle: BundleFixture,
    pub extractor: Arc<FakeExtractor>,
    pub process: Arc<RecordingProcess>,
}

impl Harness {
    /// Start a server and install `Widget.app` containing `v1`.
    pub async fn new() -> Self {
        Self::with_extractor(FakeExtractor::new(
            &["Widget.app"],
            BundleFixture::relative_executable(APP),
            b"v2",
        ))
        .await
    }

    /// Same as [`Harness::new`] with a custom extractor.
    pub async fn with_extractor(extractor: FakeExtractor) -> Self {
        init_test_logging(None);
        Self {
            server: MockServer::start().await,
            bundle: BundleFixture::new(APP, b"v1"),
            extractor: Arc::new(extractor),
            process: Arc::new(RecordingProcess::default()),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.uri(), path)
    }

    /// Default configuration: installed 1.0.0, stable channel, fast retries.
    pub fn config(&self) -> UpdaterConfig {
        let mut config = UpdaterConfig::new(self.url(FEED_PATH)).with_current_version("1.0.0");
        config.fetch_retries = 0;
        config
    }

    /// Serve `releases` as the feed.
    pub async fn serve_feed(&self, releases: &[Release]) {
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_json(releases)))
            .mount(&self.server)
            .await;
    }

    /// Serve `body` at `asset_path`, expecting exactly `hits` requests.
    pub async fn serve_asset(&self, asset_path: &str, body: &[u8], hits: u64) {
        Mock::given(method("GET"))
            .and(path(asset_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    /// Build an updater with both bundles signed by [`SIGNER`].
    pub fn updater(&self, config: UpdaterConfig) -> Updater {
        self.updater_with_identity(config, FakeIdentity::uniform(Some(SIGNER)))
    }

    pub fn updater_with_identity(&self, config: UpdaterConfig, identity: FakeIdentity) -> Updater {
        Updater::builder(config)
            .installed_bundle(self.bundle.installed().clone())
            .extractor(self.extractor.clone())
            .identity_lookup(Arc::new(identity))
            .process_control(self.process.clone())
            .build()
            .unwrap()
    }
}
