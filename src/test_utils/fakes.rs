//! In-memory stand-ins for the external collaborators.

use crate::core::Result;
use crate::identity::IdentityLookup;
use crate::installer::{Extractor, ProcessControl};
use crate::release::ContentType;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::fixtures::write_bundle;

/// "Unpacks" an archive by writing prepared bundles next to it.
pub struct FakeExtractor {
    bundles: Vec<String>,
    relative_executable: PathBuf,
    contents: Vec<u8>,
    calls: Mutex<Vec<(PathBuf, ContentType)>>,
}

impl FakeExtractor {
    /// Produce one bundle directory per entry of `bundles`.
    pub fn new(bundles: &[&str], relative_executable: impl Into<PathBuf>, contents: &[u8]) -> Self {
        Self {
            bundles: bundles.iter().map(|name| (*name).to_string()).collect(),
            relative_executable: relative_executable.into(),
            contents: contents.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Archives passed to [`Extractor::extract`] so far.
    pub fn calls(&self) -> Vec<(PathBuf, ContentType)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, archive: &Path, content_type: ContentType) -> Result<()> {
        self.calls.lock().unwrap().push((archive.to_path_buf(), content_type));
        let dir = archive.parent().unwrap();
        for name in &self.bundles {
            write_bundle(&dir.join(name), &self.relative_executable, &self.contents);
        }
        Ok(())
    }
}

/// Identity lookup answering from a fixed table with a default.
pub struct FakeIdentity {
    overrides: Vec<(PathBuf, Option<String>)>,
    default: Option<String>,
}

impl FakeIdentity {
    /// Every bundle reports `identity`.
    pub fn uniform(identity: Option<&str>) -> Self {
        Self {
            overrides: Vec::new(),
            default: identity.map(str::to_string),
        }
    }

    /// The bundle at `path` reports `identity` instead of the default.
    #[must_use]
    pub fn with(mut self, path: impl Into<PathBuf>, identity: Option<&str>) -> Self {
        self.overrides.push((path.into(), identity.map(str::to_string)));
        self
    }
}

#[async_trait]
impl IdentityLookup for FakeIdentity {
    async fn signing_identity(&self, bundle: &Path) -> Option<String> {
        self.overrides
            .iter()
            .find(|(path, _)| path == bundle)
            .map_or_else(|| self.default.clone(), |(_, identity)| identity.clone())
    }
}

/// Records launches and terminations instead of performing them.
#[derive(Default)]
pub struct RecordingProcess {
    launched: Mutex<Vec<PathBuf>>,
    killed: Mutex<Vec<u32>>,
    terminated: AtomicBool,
}

impl RecordingProcess {
    /// Executables launched so far.
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.lock().unwrap().clone()
    }

    /// Pids force-terminated so far.
    pub fn killed(&self) -> Vec<u32> {
        self.killed.lock().unwrap().clone()
    }

    /// Whether the current process was asked to exit.
    pub fn terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl ProcessControl for RecordingProcess {
    fn launch(&self, executable: &Path) -> Result<()> {
        self.launched.lock().unwrap().push(executable.to_path_buf());
        Ok(())
    }

    fn terminate_current(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn force_terminate(&self, pid: u32) -> Result<()> {
        self.killed.lock().unwrap().push(pid);
        Ok(())
    }
}
