//! Command-line smoke tests.

use crate::common::{APP, FEED_PATH};
use assert_cmd::Command;
use bundle_updater::release::ContentType;
use bundle_updater::test_utils::{BundleFixture, asset, feed_json, release};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bundle_updater(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bundle-updater").unwrap();
    cmd.arg("--config").arg(config).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("bundle-updater")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("guard"));
}

#[test]
fn test_config_init_show_and_path() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("nested").join("config.toml");

    bundle_updater(&config)
        .args(["config", "init", "https://example.com/releases.json", "--current-version", "1.2.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration"));
    assert!(config.exists());

    bundle_updater(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("feed_url = \"https://example.com/releases.json\""))
        .stdout(predicate::str::contains("current_version = \"1.2.0\""));

    bundle_updater(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    bundle_updater(&config)
        .args(["config", "init", "https://example.com/other.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_init_rejects_bad_url() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");

    bundle_updater(&config).args(["config", "init", "not a url"]).assert().failure().code(1);
    assert!(!config.exists());
}

#[test]
fn test_check_without_config_fails() {
    let temp = TempDir::new().unwrap();
    let bundle = BundleFixture::new(APP, b"v1");

    bundle_updater(&temp.path().join("missing.toml"))
        .arg("check")
        .arg("--bundle")
        .arg(bundle.installed().root())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to read updater config"));
}

#[test]
fn test_executable_requires_bundle() {
    let temp = TempDir::new().unwrap();
    bundle_updater(&temp.path().join("config.toml"))
        .args(["check", "--executable", "Contents/MacOS/Widget"])
        .assert()
        .failure();
}

#[tokio::test]
async fn test_check_reports_available_update() {
    let server = MockServer::start().await;
    let releases = [release(
        "v2.0.0",
        false,
        vec![asset(
            "Widget.zip",
            &format!("{}/dl/Widget.zip", server.uri()),
            ContentType::Zip,
            42,
        )],
    )];
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed_json(&releases)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let config = temp.path().join("config.toml");
    std::fs::write(
        &config,
        format!("feed_url = \"{}{FEED_PATH}\"\ncurrent_version = \"1.0.0\"\n", server.uri()),
    )
    .unwrap();
    let bundle = BundleFixture::new(APP, b"v1");
    let root = bundle.installed().root().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        bundle_updater(&config).arg("check").arg("--bundle").arg(&root).assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Latest release: v2.0.0"))
        .stdout(predicate::str::contains("Update available: 1.0.0 -> 2.0.0"))
        .stdout(predicate::str::contains("Asset: Widget.zip (42 bytes"))
        .stdout(predicate::str::contains("Release notes for v2.0.0"));
    // The check never touches the installed bundle.
    assert_eq!(bundle.executable_contents(), b"v1");
}
