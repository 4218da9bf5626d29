//! On-disk bundles and release feeds for tests.

use crate::installer::InstalledBundle;
use crate::release::{Asset, ContentType, Release};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a minimal bundle: `root/<relative_executable>` with `contents`.
pub fn write_bundle(root: &Path, relative_executable: &Path, contents: &[u8]) {
    let executable = root.join(relative_executable);
    if let Some(parent) = executable.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&executable, contents).unwrap();
    std::fs::write(root.join("Contents").join("Info.plist"), b"<plist/>").ok();
}

/// An installed `<Name>.app` inside a temporary `Applications` directory.
pub struct BundleFixture {
    _temp: TempDir,
    apps: PathBuf,
    installed: InstalledBundle,
}

impl BundleFixture {
    /// Install `Name.app` with `Contents/MacOS/Name` holding `contents`.
    pub fn new(name: &str, contents: &[u8]) -> Self {
        let temp = TempDir::new().unwrap();
        let apps = temp.path().join("Applications");
        let root = apps.join(format!("{name}.app"));
        let relative = Self::relative_executable(name);
        write_bundle(&root, &relative, contents);

        let installed = InstalledBundle::new(&root, root.join(&relative)).unwrap();
        Self {
            _temp: temp,
            apps,
            installed,
        }
    }

    /// `Contents/MacOS/<name>`.
    pub fn relative_executable(name: &str) -> PathBuf {
        Path::new("Contents").join("MacOS").join(name)
    }

    /// The installed bundle.
    pub fn installed(&self) -> &InstalledBundle {
        &self.installed
    }

    /// Directory holding the bundle.
    pub fn apps_dir(&self) -> &Path {
        &self.apps
    }

    /// Current bytes of the installed executable.
    pub fn executable_contents(&self) -> Vec<u8> {
        std::fs::read(self.installed.executable()).unwrap()
    }

    /// Names of the entries next to the bundle, sorted.
    pub fn siblings(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.apps)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// An asset record.
pub fn asset(name: &str, url: &str, content_type: ContentType, size: u64) -> Asset {
    Asset {
        name: name.to_string(),
        size,
        content_type,
        browser_download_url: url.to_string(),
        digest: None,
    }
}

/// A release record.
pub fn release(tag: &str, prerelease: bool, assets: Vec<Asset>) -> Release {
    Release {
        tag_name: tag.to_string(),
        prerelease,
        assets,
        body: format!("Release notes for {tag}"),
    }
}

/// Serialize releases as a feed document.
pub fn feed_json(releases: &[Release]) -> String {
    serde_json::to_string(releases).unwrap()
}
