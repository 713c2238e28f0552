//! OS process handles: liveness checks, signals, and detached spawning.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// One OS process identified by its PID.
///
/// Liveness is an existence check only: a recycled PID belonging to an
/// unrelated process is reported alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: u32,
}

impl ProcessHandle {
    /// Returns `None` for PIDs the OS cannot address (zero or beyond `pid_t`).
    pub fn new(pid: u32) -> Option<Self> {
        if pid == 0 || i32::try_from(pid).is_err() {
            return None;
        }
        Some(Self { pid })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn raw(&self) -> Pid {
        // Range checked in `new`.
        Pid::from_raw(self.pid as i32)
    }

    /// True iff a process with this PID exists.
    ///
    /// Children of the current process are reaped first, so an exited child
    /// reads as dead instead of lingering as a zombie.
    pub fn is_alive(&self) -> bool {
        match waitpid(self.raw(), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => return true,
            Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => return false,
            Ok(_) => return true,
            // Not our child; fall through to the existence check.
            Err(_) => {}
        }

        match signal::kill(self.raw(), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    /// Send SIGTERM. `Ok(false)` means the process was already gone.
    pub fn terminate(&self) -> Result<bool, Errno> {
        self.send(Signal::SIGTERM)
    }

    /// Send SIGKILL. `Ok(false)` means the process was already gone.
    pub fn kill(&self) -> Result<bool, Errno> {
        self.send(Signal::SIGKILL)
    }

    fn send(&self, sig: Signal) -> Result<bool, Errno> {
        match signal::kill(self.raw(), sig) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Launch `command` in its own process group with `cwd` as working directory,
/// stdin from `/dev/null` and stdout/stderr appended to `log`.
///
/// The child is not waited on; it outlives the supervisor invocation.
pub fn spawn_detached(
    command: &[String],
    env: &HashMap<String, String>,
    cwd: &Path,
    log: File,
) -> io::Result<ProcessHandle> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    let stderr = log.try_clone()?;
    let child = Command::new(program)
        .args(args)
        .envs(env)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(stderr))
        .process_group(0)
        .spawn()?;

    ProcessHandle::new(child.id())
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "spawned process has no valid PID"))
}
