//! Single-instance enforcement.
//!
//! Every running copy of the application registers a marker file named after
//! its pid in a per-application registry directory. The marker holds the pid,
//! the registration time in milliseconds and the executable path:
//!
//! ```text
//! <registry>/instances/4242   "4242\n1718200000000\n/Applications/Widget.app/Contents/MacOS/Widget\n"
//! ```
//!
//! A marker only counts while its pid is running the same executable. Markers
//! of exited processes, and of pids the OS has since handed to another
//! program, are swept whenever the registry is listed. When more than one
//! live instance is registered, the oldest instance other than the caller is
//! force-terminated.

use crate::core::{Result, UpdaterError};
use crate::installer::ProcessControl;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One registered instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    /// Process id.
    pub pid: u32,
    /// Registration time, milliseconds since the Unix epoch.
    pub started_at: i64,
    /// Executable the instance was running when it registered.
    pub executable: PathBuf,
}

/// Directory of instance markers for one application.
#[derive(Debug, Clone)]
pub struct InstanceRegistry {
    dir: PathBuf,
    pid: u32,
    executable: PathBuf,
}

impl InstanceRegistry {
    /// Registry rooted at `dir` for the current process.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let pid = std::process::id();
        let executable = std::env::current_exe()
            .ok()
            .or_else(|| process_executable(pid))
            .unwrap_or_default();
        Self::with_identity(dir, pid, executable)
    }

    /// Registry rooted at `dir` acting on behalf of `pid` running `executable`.
    pub fn with_identity(dir: impl Into<PathBuf>, pid: u32, executable: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pid,
            executable: executable.into(),
        }
    }

    /// Default registry location for `app_id`.
    ///
    /// Uses the runtime directory where the platform has one, falling back to
    /// the cache directory and then the temp directory.
    pub fn for_app(app_id: &str) -> Self {
        let base = dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("bundle-updater").join(sanitize(app_id)).join("instances"))
    }

    /// Registry directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register this process and return a guard that unregisters it on drop.
    pub fn register(&self) -> Result<InstanceGuard> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| UpdaterError::fs("create instance registry", &self.dir, &e))?;

        let marker = self.dir.join(self.pid.to_string());
        let started_at = chrono::Utc::now().timestamp_millis();
        // A marker with our pid can only be left over from an earlier process.
        let mut file = fs::File::create(&marker)
            .map_err(|e| UpdaterError::fs("create instance marker", &marker, &e))?;
        write!(file, "{}\n{}\n{}\n", self.pid, started_at, self.executable.display())
            .map_err(|e| UpdaterError::fs("write instance marker", &marker, &e))?;

        debug!("Registered instance {} at {}", self.pid, marker.display());
        Ok(InstanceGuard {
            marker,
        })
    }

    /// Live instances ordered oldest first, sweeping stale markers.
    pub fn live_instances(&self) -> Result<Vec<InstanceRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(UpdaterError::fs("read instance registry", &self.dir, &e)),
        };

        let mut live = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| UpdaterError::fs("read instance registry", &self.dir, &e))?;
            let path = entry.path();
            match read_marker(&path) {
                Some(record) if record.pid == self.pid || is_same_instance(&record) => {
                    live.push(record);
                }
                _ => {
                    debug!("Removing stale instance marker {}", path.display());
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("Failed to remove stale marker {}: {}", path.display(), e);
                    }
                }
            }
        }

        live.sort_by_key(|record| (record.started_at, record.pid));
        Ok(live)
    }

    /// Force-terminate the oldest live instance other than this one, if there
    /// is more than one live instance.
    pub fn terminate_oldest_other(
        &self,
        process: &dyn ProcessControl,
    ) -> Result<Option<InstanceRecord>> {
        let live = self.live_instances()?;
        if live.len() <= 1 {
            return Ok(None);
        }

        let Some(oldest) = live.into_iter().find(|record| record.pid != self.pid) else {
            return Ok(None);
        };

        info!(
            "Another instance is running (pid {}, {}), terminating it",
            oldest.pid,
            oldest.executable.display()
        );
        process.force_terminate(oldest.pid)?;

        let marker = self.dir.join(oldest.pid.to_string());
        if let Err(e) = fs::remove_file(&marker) {
            warn!("Failed to remove marker {}: {}", marker.display(), e);
        }
        Ok(Some(oldest))
    }
}

/// Keeps this process registered until dropped.
#[derive(Debug)]
pub struct InstanceGuard {
    marker: PathBuf,
}

impl InstanceGuard {
    /// Marker file backing this registration.
    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.marker) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove instance marker {}: {}", self.marker.display(), e),
        }
    }
}

fn read_marker(path: &Path) -> Option<InstanceRecord> {
    let content = fs::read_to_string(path).ok()?;
    let mut lines = content.lines();
    let pid = lines.next()?.trim().parse().ok()?;
    let started_at = lines.next()?.trim().parse().ok()?;
    let executable = lines.next().map(str::trim).filter(|line| !line.is_empty())?;
    Some(InstanceRecord {
        pid,
        started_at,
        executable: PathBuf::from(executable),
    })
}

/// Whether the marker's pid is still running the executable it registered.
///
/// Executables are compared by file name. An update replaces the bundle
/// under a running instance, so its full path may no longer resolve.
fn is_same_instance(record: &InstanceRecord) -> bool {
    if !is_pid_running(record.pid) {
        return false;
    }
    let Some(live) = process_executable(record.pid) else {
        debug!("Cannot read the executable of pid {}", record.pid);
        return false;
    };
    let matches = same_executable_name(&live, &record.executable);
    if !matches {
        debug!(
            "pid {} now runs {}, not {}",
            record.pid,
            live.display(),
            record.executable.display()
        );
    }
    matches
}

fn same_executable_name(a: &Path, b: &Path) -> bool {
    match (a.file_name(), b.file_name()) {
        (Some(a), Some(b)) if cfg!(windows) => {
            a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
        }
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Executable currently running as `pid`, if it can be determined.
pub fn process_executable(pid: u32) -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let link = fs::read_link(format!("/proc/{pid}/exe")).ok()?;
        // Replaced or removed binaries read back as "<path> (deleted)".
        let raw = link.to_string_lossy();
        Some(PathBuf::from(raw.strip_suffix(" (deleted)").unwrap_or(&raw)))
    }
    #[cfg(all(unix, not(target_os = "linux")))]
    {
        let output = std::process::Command::new("ps")
            .args(["-p", &pid.to_string(), "-o", "comm="])
            .output()
            .ok()?;
        let comm = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (output.status.success() && !comm.is_empty()).then(|| PathBuf::from(comm))
    }
    #[cfg(not(unix))]
    {
        let output = std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/FO", "CSV", "/NH"])
            .output()
            .ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let image = stdout.lines().next()?.split(',').next()?.trim_matches('"').to_string();
        (!image.is_empty() && !image.starts_with("INFO:")).then(|| PathBuf::from(image))
    }
}

fn sanitize(app_id: &str) -> String {
    app_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

/// Whether a process with `pid` exists.
pub fn is_pid_running(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        pid != 0 && Path::new(&format!("/proc/{pid}")).exists()
    }
    #[cfg(all(unix, not(target_os = "linux")))]
    {
        let Ok(pid_i32) = i32::try_from(pid) else {
            return false;
        };
        if pid_i32 <= 0 {
            return false;
        }
        // SAFETY: signal 0 performs only the existence and permission check.
        // EPERM means the process exists but belongs to someone else.
        unsafe {
            libc::kill(pid_i32, 0) == 0
                || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
        }
    }
    #[cfg(not(unix))]
    {
        std::process::Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/NH"])
            .output()
            .map(|out| String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()))
            .unwrap_or(false)
    }
}
