//! Cycles that must fail without touching the installed bundle.

use crate::common::{Harness, SIGNER};
use bundle_updater::core::UpdaterError;
use bundle_updater::release::ContentType;
use bundle_updater::test_utils::{BundleFixture, FakeExtractor, FakeIdentity, asset, release};
use bundle_updater::updater::UpdateOutcome;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn expect_failure(outcome: UpdateOutcome) -> UpdaterError {
    match outcome {
        UpdateOutcome::UpdateFailed(e) => e,
        other => panic!("expected a failure, got: {other}"),
    }
}

async fn serve_v2(h: &Harness) {
    h.serve_feed(&[release(
        "v2.0.0",
        false,
        vec![asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 0)],
    )])
    .await;
}

/// Identity mismatch: the swap never runs.
#[tokio::test]
async fn test_identity_mismatch_leaves_bundle_unchanged() {
    let h = Harness::new().await;
    serve_v2(&h).await;
    h.serve_asset("/dl/Widget.zip", b"zip", 1).await;

    let identity = FakeIdentity::uniform(Some("Developer ID Application: Mallory"))
        .with(h.bundle.installed().root(), Some(SIGNER));
    let outcome = h.updater_with_identity(h.config(), identity).check_and_update().await;

    let err = expect_failure(outcome);
    assert!(matches!(err, UpdaterError::CodeSigningIdentityMismatch { .. }));
    assert_eq!(h.bundle.executable_contents(), b"v1");
    assert_eq!(h.bundle.siblings(), vec!["Widget.app".to_string()]);
    assert!(h.process.launched().is_empty());
}

/// Signed installed bundle, unsigned download.
#[tokio::test]
async fn test_unsigned_download_is_rejected() {
    let h = Harness::new().await;
    serve_v2(&h).await;
    h.serve_asset("/dl/Widget.zip", b"zip", 1).await;

    let identity = FakeIdentity::uniform(None).with(h.bundle.installed().root(), Some(SIGNER));
    let mut config = h.config();
    config.allow_unsigned = true;
    let err = expect_failure(h.updater_with_identity(config, identity).check_and_update().await);

    assert!(matches!(err, UpdaterError::CodeSigningIdentityMismatch { .. }));
    assert_eq!(h.bundle.executable_contents(), b"v1");
}

/// Both unsigned: rejected unless `allow_unsigned` is set.
#[tokio::test]
async fn test_unsigned_pair_follows_policy() {
    let h = Harness::new().await;
    serve_v2(&h).await;
    h.serve_asset("/dl/Widget.zip", b"zip", 2).await;

    let err = expect_failure(
        h.updater_with_identity(h.config(), FakeIdentity::uniform(None)).check_and_update().await,
    );
    assert!(matches!(err, UpdaterError::CodeSigningIdentityMismatch { .. }));
    assert_eq!(h.bundle.executable_contents(), b"v1");

    let mut config = h.config();
    config.allow_unsigned = true;
    config.relaunch = false;
    let outcome = h.updater_with_identity(config, FakeIdentity::uniform(None)).check_and_update().await;
    assert!(outcome.updated());
    assert_eq!(h.bundle.executable_contents(), b"v2");
}

/// Archive with two bundles fails loudly.
#[tokio::test]
async fn test_ambiguous_archive_is_rejected() {
    let h = Harness::with_extractor(FakeExtractor::new(
        &["Widget.app", "Widget Helper.app"],
        BundleFixture::relative_executable("Widget"),
        b"v2",
    ))
    .await;
    serve_v2(&h).await;
    h.serve_asset("/dl/Widget.zip", b"zip", 1).await;

    let err = expect_failure(h.updater(h.config()).check_and_update().await);
    assert!(matches!(err, UpdaterError::InvalidDownloadedBundle { .. }));
    assert_eq!(h.bundle.executable_contents(), b"v1");
    assert_eq!(h.bundle.siblings(), vec!["Widget.app".to_string()]);
}

/// Bundle without the executable at the expected path.
#[tokio::test]
async fn test_bundle_without_executable_is_rejected() {
    let h = Harness::with_extractor(FakeExtractor::new(
        &["Widget.app"],
        "Contents/MacOS/SomethingElse",
        b"v2",
    ))
    .await;
    serve_v2(&h).await;
    h.serve_asset("/dl/Widget.zip", b"zip", 1).await;

    let err = expect_failure(h.updater(h.config()).check_and_update().await);
    assert!(matches!(err, UpdaterError::InvalidDownloadedBundle { .. }));
    assert_eq!(h.bundle.executable_contents(), b"v1");
}

/// Asset download returning 404.
#[tokio::test]
async fn test_asset_http_error() {
    let h = Harness::new().await;
    serve_v2(&h).await;
    Mock::given(method("GET"))
        .and(path("/dl/Widget.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&h.server)
        .await;

    let err = expect_failure(h.updater(h.config()).check_and_update().await);
    assert!(matches!(
        err,
        UpdaterError::HttpStatus {
            status: 404,
            ..
        }
    ));
    assert!(h.extractor.calls().is_empty());
    assert_eq!(h.bundle.siblings(), vec!["Widget.app".to_string()]);
}

/// Published digest that does not match the download.
#[tokio::test]
async fn test_checksum_mismatch() {
    let h = Harness::new().await;
    let mut zip = asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 3);
    zip.digest = Some(format!("sha256:{}", "0".repeat(64)));
    h.serve_feed(&[release("v2.0.0", false, vec![zip])]).await;
    h.serve_asset("/dl/Widget.zip", b"zip", 1).await;

    let err = expect_failure(h.updater(h.config()).check_and_update().await);
    assert!(matches!(err, UpdaterError::ChecksumMismatch { .. }));
    assert!(h.extractor.calls().is_empty());
    assert_eq!(h.bundle.executable_contents(), b"v1");
}

/// Matching digest passes.
#[tokio::test]
async fn test_matching_checksum_installs() {
    let h = Harness::new().await;
    let mut zip = asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 11);
    // sha256("hello world")
    zip.digest = Some(
        "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9".to_string(),
    );
    h.serve_feed(&[release("v2.0.0", false, vec![zip])]).await;
    h.serve_asset("/dl/Widget.zip", b"hello world", 1).await;

    let mut config = h.config();
    config.relaunch = false;
    assert!(h.updater(config).check_and_update().await.updated());
}

/// Feed errors propagate from the feed-only entry point and become a failed
/// outcome from the cycle.
#[tokio::test]
async fn test_malformed_feed() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"tag_name": "v2.0.0"}]"#))
        .mount(&h.server)
        .await;

    let updater = h.updater(h.config());
    assert!(matches!(updater.latest_release().await, Err(UpdaterError::Decoding(_))));
    assert!(matches!(
        expect_failure(updater.check_and_update().await),
        UpdaterError::Decoding(_)
    ));
}

/// Feed server down after retries.
#[tokio::test]
async fn test_feed_server_error_after_retries() {
    let h = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/releases"))
        .respond_with(ResponseTemplate::new(502))
        .expect(2)
        .mount(&h.server)
        .await;

    let mut config = h.config();
    config.fetch_retries = 1;
    let err = h.updater(config).latest_release().await.unwrap_err();
    assert!(matches!(
        err,
        UpdaterError::HttpStatus {
            status: 502,
            ..
        }
    ));
}
