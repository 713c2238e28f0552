//! Single-slot persistent record of the server's PID.
//!
//! A present record does not imply a live process; callers check
//! [`ProcessHandle::is_alive`] and clear stale records themselves.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use tracing::{debug, warn};

use crate::error::SupervisorError;
use crate::process::ProcessHandle;

#[derive(Debug, Clone)]
pub struct PidStore {
    path: PathBuf,
}

impl PidStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the recorded PID. A missing file is "no record"; an unparsable
    /// one is logged, removed, and also treated as "no record".
    pub fn read(&self) -> Result<Option<ProcessHandle>, SupervisorError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.error(source)),
        };

        match parse_pid(&contents) {
            Some(handle) => Ok(Some(handle)),
            None => {
                warn!(
                    path = %self.path.display(),
                    contents = contents.trim(),
                    "invalid PID record, removing"
                );
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Record `handle`, replacing any previous record. Written to a temp file
    /// and renamed so readers never see a partial PID.
    pub fn write(&self, handle: ProcessHandle) -> Result<(), SupervisorError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, format!("{}\n", handle.pid())).map_err(|e| self.error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.error(e))?;
        debug!(pid = handle.pid(), path = %self.path.display(), "PID recorded");
        Ok(())
    }

    /// Remove the record. Clearing an absent record is not an error.
    pub fn clear(&self) -> Result<(), SupervisorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "PID record removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.error(source)),
        }
    }

    /// Open the advisory lock guarding the start sequence. The caller takes
    /// the write guard and holds it until the new record is verified.
    pub fn start_lock(&self) -> Result<RwLock<File>, SupervisorError> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| SupervisorError::PidFile {
                path: lock_path.clone(),
                source,
            })?;
        Ok(RwLock::new(file))
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn error(&self, source: io::Error) -> SupervisorError {
        SupervisorError::PidFile {
            path: self.path.clone(),
            source,
        }
    }
}

fn parse_pid(contents: &str) -> Option<ProcessHandle> {
    contents.trim().parse::<u32>().ok().and_then(ProcessHandle::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_pid() {
        assert_eq!(parse_pid("1234\n").map(|h| h.pid()), Some(1234));
        assert_eq!(parse_pid("  77 ").map(|h| h.pid()), Some(77));
    }

    #[test]
    fn rejects_garbage_and_zero() {
        assert!(parse_pid("").is_none());
        assert!(parse_pid("abc").is_none());
        assert!(parse_pid("0").is_none());
        assert!(parse_pid("-5").is_none());
    }

    #[test]
    fn lock_path_sits_next_to_record() {
        let store = PidStore::new("/srv/bridge/.server.pid");
        assert_eq!(store.lock_path(), PathBuf::from("/srv/bridge/.server.pid.lock"));
    }
}
