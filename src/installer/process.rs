//! Process launch and termination.
//!
//! The relaunch after an install is fire-and-forget: the new process is
//! spawned and the current one asked to exit, with no handshake in between.

use crate::core::{Result, UpdaterError};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Starts and stops application processes.
pub trait ProcessControl: Send + Sync {
    /// Start `executable` detached from the current process.
    fn launch(&self, executable: &Path) -> Result<()>;

    /// Ask the current process to exit.
    fn terminate_current(&self);

    /// Kill another process immediately.
    fn force_terminate(&self, pid: u32) -> Result<()>;
}

/// [`ProcessControl`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcess;

impl ProcessControl for SystemProcess {
    fn launch(&self, executable: &Path) -> Result<()> {
        let child = Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| UpdaterError::fs("launch executable", executable, &e))?;
        info!("Launched {} (pid {})", executable.display(), child.id());
        Ok(())
    }

    fn terminate_current(&self) {
        info!("Terminating current process after update");
        #[cfg(unix)]
        {
            // SIGTERM lets the host application run its shutdown handlers.
            // SAFETY: signalling our own pid has no memory-safety preconditions.
            let rc = unsafe { libc::kill(libc::getpid(), libc::SIGTERM) };
            if rc == 0 {
                return;
            }
            warn!("Failed to signal current process: {}", std::io::Error::last_os_error());
        }
        std::process::exit(0);
    }

    fn force_terminate(&self, pid: u32) -> Result<()> {
        #[cfg(unix)]
        {
            let pid_i32 = i32::try_from(pid)
                .ok()
                .filter(|pid| *pid > 0)
                .ok_or_else(|| UpdaterError::BadInput {
                    message: format!("invalid pid {pid}"),
                })?;
            // SAFETY: kill has no memory-safety preconditions; pid is validated positive.
            let rc = unsafe { libc::kill(pid_i32, libc::SIGKILL) };
            if rc != 0 {
                return Err(UpdaterError::IoError(std::io::Error::last_os_error()));
            }
            Ok(())
        }
        #[cfg(windows)]
        {
            let status = Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()?;
            if !status.success() {
                return Err(UpdaterError::IoError(std::io::Error::other(format!(
                    "taskkill exited with {status}"
                ))));
            }
            Ok(())
        }
        #[cfg(not(any(unix, windows)))]
        {
            Err(UpdaterError::BadInput {
                message: format!("cannot terminate pid {pid} on this platform"),
            })
        }
    }
}
