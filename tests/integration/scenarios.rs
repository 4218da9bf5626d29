//! Full check-and-update cycles.

use crate::common::{APP, Harness};
use bundle_updater::release::ContentType;
use bundle_updater::test_utils::{BundleFixture, asset, release};
use bundle_updater::updater::UpdateOutcome;
use semver::Version;

/// Stable v2.0.0 with a zip asset over installed v1.0.0 is installed.
#[tokio::test]
async fn test_newer_stable_release_is_installed() {
    let h = Harness::new().await;
    h.serve_feed(&[release(
        "v2.0.0",
        false,
        vec![asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 7)],
    )])
    .await;
    h.serve_asset("/dl/Widget.zip", b"zipdata", 1).await;

    let updater = h.updater(h.config());
    let selected = updater.latest_release().await.unwrap().unwrap();
    assert_eq!(selected.version(), Version::new(2, 0, 0));

    let outcome = updater.check_and_update().await;

    match &outcome {
        UpdateOutcome::UpdateInstalled {
            version,
            executable,
        } => {
            assert_eq!(*version, Version::new(2, 0, 0));
            assert_eq!(executable, h.bundle.installed().executable());
        }
        other => panic!("unexpected outcome: {other}"),
    }
    assert!(outcome.updated());
    assert_eq!(h.bundle.executable_contents(), b"v2");

    let calls = h.extractor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, ContentType::Zip);
    assert!(calls[0].0.ends_with("Widget.zip"));

    // Scratch directory and swap leftovers are gone.
    assert_eq!(h.bundle.siblings(), vec![format!("{APP}.app")]);

    // Relaunch is on by default.
    assert_eq!(h.process.launched(), vec![h.bundle.installed().executable().to_path_buf()]);
    assert!(h.process.terminated());
}

/// Installed v1.0.0, feed has stable v1.0.0 and prerelease v2.0.0-beta.
#[tokio::test]
async fn test_prerelease_excluded_and_stable_not_newer() {
    let h = Harness::new().await;
    h.serve_feed(&[
        release("v1.0.0", false, vec![asset("Widget.zip", &h.url("/dl/1.zip"), ContentType::Zip, 0)]),
        release(
            "v2.0.0-beta",
            true,
            vec![asset("Widget.zip", &h.url("/dl/2.zip"), ContentType::Zip, 0)],
        ),
    ])
    .await;
    h.serve_asset("/dl/1.zip", b"x", 0).await;
    h.serve_asset("/dl/2.zip", b"x", 0).await;

    let updater = h.updater(h.config());
    assert_eq!(updater.latest_release().await.unwrap().unwrap().tag_name, "v1.0.0");
    assert!(updater.available_update().await.unwrap().is_none());

    let outcome = updater.check_and_update().await;
    assert!(matches!(outcome, UpdateOutcome::NoUpdateAvailable));
    assert_eq!(h.bundle.executable_contents(), b"v1");
    assert!(h.extractor.calls().is_empty());
}

/// The prerelease channel picks the beta.
#[tokio::test]
async fn test_prerelease_channel_installs_beta() {
    let h = Harness::new().await;
    h.serve_feed(&[
        release("v1.0.0", false, vec![asset("Widget.zip", &h.url("/dl/1.zip"), ContentType::Zip, 0)]),
        release(
            "v2.0.0-beta",
            true,
            vec![asset("Widget.zip", &h.url("/dl/2.zip"), ContentType::Zip, 0)],
        ),
    ])
    .await;
    h.serve_asset("/dl/2.zip", b"beta", 1).await;

    let mut config = h.config().with_allow_prereleases(true);
    config.relaunch = false;
    let outcome = h.updater(config).check_and_update().await;

    assert!(outcome.updated());
    assert_eq!(h.bundle.executable_contents(), b"v2");
    assert!(h.process.launched().is_empty());
    assert!(!h.process.terminated());
}

/// Only a `.tar.gz` asset while `.zip` is expected: nothing is downloaded.
#[tokio::test]
async fn test_release_without_platform_asset_is_no_update() {
    let h = Harness::new().await;
    h.serve_feed(&[release(
        "v2.0.0",
        false,
        vec![asset("Widget.tar.gz", &h.url("/dl/Widget.tar.gz"), ContentType::Tar, 4)],
    )])
    .await;
    h.serve_asset("/dl/Widget.tar.gz", b"tgz!", 0).await;

    let outcome = h.updater(h.config()).check_and_update().await;

    assert!(matches!(outcome, UpdateOutcome::NoUpdateAvailable));
    assert!(!outcome.updated());
    assert_eq!(h.bundle.executable_contents(), b"v1");
    assert_eq!(h.bundle.siblings(), vec!["Widget.app".to_string()]);
}

/// With a `.tar.gz` suffix configured the tar asset is used.
#[tokio::test]
async fn test_custom_asset_suffix_selects_tar() {
    let h = Harness::new().await;
    h.serve_feed(&[release(
        "v2.0.0",
        false,
        vec![
            asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 0),
            asset("Widget.tar.gz", &h.url("/dl/Widget.tar.gz"), ContentType::Tar, 0),
        ],
    )])
    .await;
    h.serve_asset("/dl/Widget.tar.gz", b"tgz!", 1).await;

    let mut config = h.config();
    config.asset_suffix = ".tar.gz".to_string();
    config.relaunch = false;
    let outcome = h.updater(config).check_and_update().await;

    assert!(outcome.updated());
    assert_eq!(h.extractor.calls()[0].1, ContentType::Tar);
}

/// Same version as installed is not an update.
#[tokio::test]
async fn test_equal_version_is_no_update() {
    let h = Harness::new().await;
    h.serve_feed(&[release(
        "1.0.0",
        false,
        vec![asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 0)],
    )])
    .await;

    let outcome = h.updater(h.config()).check_and_update().await;
    assert!(matches!(outcome, UpdateOutcome::NoUpdateAvailable));
}

/// An explicit scratch directory is used and cleaned up.
#[tokio::test]
async fn test_explicit_scratch_dir() {
    let h = Harness::new().await;
    h.serve_feed(&[release(
        "v3.1.0",
        false,
        vec![asset("Widget.zip", &h.url("/dl/Widget.zip"), ContentType::Zip, 0)],
    )])
    .await;
    h.serve_asset("/dl/Widget.zip", b"zip", 1).await;

    let scratch = tempfile::TempDir::new().unwrap();
    let mut config = h.config();
    config.scratch_dir = Some(scratch.path().to_path_buf());
    config.relaunch = false;

    let outcome = h.updater(config).check_and_update().await;

    assert!(outcome.updated());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    assert_eq!(
        std::fs::read(h.bundle.installed().root().join(BundleFixture::relative_executable(APP)))
            .unwrap(),
        b"v2"
    );
}
