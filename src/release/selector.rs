//! Update selection policy.
//!
//! Pure functions over a parsed feed. Selection happens in three steps:
//!
//! 1. [`select_update`] keeps releases on the requested channel that carry at
//!    least one asset and returns the highest version among them.
//! 2. [`is_newer`] decides whether that release is strictly newer than the
//!    installed version. Equal or older versions are not an update.
//! 3. [`find_platform_asset`] picks the asset installable on this platform.
//!    A release without one is "no viable update", not a failure.

use super::{Asset, Release};
use semver::Version;

/// Pick the single viable release for the given channel.
///
/// Channel filtering is exact: with `allow_prerelease == true` only
/// prereleases are considered, otherwise only stable releases. Releases with
/// no assets are skipped. When several releases share the highest version the
/// one appearing later in the feed wins.
///
/// ```rust
/// use bundle_updater::release::{parse_feed, select_update};
///
/// let feed = br#"[
///   {"tag_name": "v1.0.0", "prerelease": false, "body": "", "assets": [
///     {"name": "a.zip", "size": 1, "content_type": "application/zip",
///      "browser_download_url": "https://example.com/a.zip"}]},
///   {"tag_name": "v2.0.0-beta", "prerelease": true, "body": "", "assets": [
///     {"name": "b.zip", "size": 1, "content_type": "application/zip",
///      "browser_download_url": "https://example.com/b.zip"}]}
/// ]"#;
/// let releases = parse_feed(feed).unwrap();
/// assert_eq!(select_update(&releases, false).unwrap().tag_name, "v1.0.0");
/// assert_eq!(select_update(&releases, true).unwrap().tag_name, "v2.0.0-beta");
/// ```
pub fn select_update(releases: &[Release], allow_prerelease: bool) -> Option<&Release> {
    let mut candidates: Vec<(Version, &Release)> = releases
        .iter()
        .filter(|release| release.prerelease == allow_prerelease)
        .filter(|release| !release.assets.is_empty())
        .map(|release| (release.version(), release))
        .collect();

    // Stable sort keeps feed order on ties, so the last entry is the later one.
    candidates.sort_by(|(a, _), (b, _)| a.cmp(b));
    candidates.pop().map(|(_, release)| release)
}

/// Whether `release` is strictly newer than `current`.
pub fn is_newer(release: &Release, current: &Version) -> bool {
    release.version() > *current
}

/// First asset whose download URL path ends with `suffix`.
pub fn find_platform_asset<'a>(release: &'a Release, suffix: &str) -> Option<&'a Asset> {
    release.assets.iter().find(|asset| asset.url_path().ends_with(suffix))
}
