//! Error taxonomy for supervisor operations.
//!
//! The first group of variants are anticipated dispositions: each one is
//! reported to the operator as a message plus a next action, never as a
//! crash. The rest are faults from the OS or the HTTP stack.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("server is already running (PID {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("server is not running")]
    NotRunning,

    #[error("server is not running (stale PID record {pid} removed)")]
    StaleRecord { pid: u32 },

    #[error("server failed to start")]
    SpawnFailed { log_path: PathBuf },

    #[error("{name} is not reachable at {url}")]
    DependencyUnreachable { name: String, url: String },

    #[error("no log file at {}", path.display())]
    LogFileMissing { path: PathBuf },

    #[error("failed to launch `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal PID {pid}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("PID file {}", path.display())]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to build HTTP client")]
    Http(#[from] reqwest::Error),
}

impl SupervisorError {
    /// True for the anticipated dispositions that are reported, not raised.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning { .. }
                | Self::NotRunning
                | Self::StaleRecord { .. }
                | Self::SpawnFailed { .. }
                | Self::DependencyUnreachable { .. }
                | Self::LogFileMissing { .. }
        )
    }

    /// The next action an operator should take, if there is one.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::AlreadyRunning { .. } => {
                Some("use `membridge restart` to replace it".into())
            }
            Self::NotRunning | Self::StaleRecord { .. } => {
                Some("run `membridge start` to launch it".into())
            }
            Self::SpawnFailed { log_path } => {
                Some(format!("check the log at {}", log_path.display()))
            }
            Self::DependencyUnreachable { name, .. } => {
                Some(format!("start {name} manually if the server needs it"))
            }
            Self::LogFileMissing { .. } => {
                Some("the log is created by `membridge start`".into())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anticipated_dispositions_are_expected() {
        assert!(SupervisorError::NotRunning.is_expected());
        assert!(SupervisorError::StaleRecord { pid: 42 }.is_expected());
        assert!(SupervisorError::AlreadyRunning { pid: 42 }.is_expected());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!SupervisorError::Io(io).is_expected());
    }

    #[test]
    fn spawn_failure_points_at_log() {
        let err = SupervisorError::SpawnFailed {
            log_path: PathBuf::from("/tmp/logs/server.log"),
        };
        assert_eq!(err.to_string(), "server failed to start");
        assert_eq!(
            err.hint().as_deref(),
            Some("check the log at /tmp/logs/server.log")
        );
    }

    #[test]
    fn stale_record_names_pid() {
        let err = SupervisorError::StaleRecord { pid: 99999 };
        assert!(err.to_string().contains("99999"));
        assert!(err.hint().unwrap().contains("membridge start"));
    }
}
