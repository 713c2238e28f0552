//! Append-only log file capturing the supervised server's stdout and stderr.

use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::io::{self, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::error::SupervisorError;

/// How often `follow` looks for new output once it has caught up.
const FOLLOW_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create the log directory if needed.
    pub fn ensure_dir(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Open the log for appending and mark the start of a new run, returning
    /// the handle the server's output is redirected into.
    pub fn open_for_run(&self, command: &[String]) -> io::Result<File> {
        self.ensure_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        writeln!(file, "--- {timestamp} starting: {} ---", command.join(" "))?;
        file.flush()?;
        Ok(file)
    }

    /// Stream the log to `out` from the current end of file (after replaying
    /// the last `backlog` lines) until `stop` resolves.
    pub async fn follow<W, S>(
        &self,
        out: &mut W,
        backlog: usize,
        stop: S,
    ) -> Result<(), SupervisorError>
    where
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        if !self.exists() {
            return Err(SupervisorError::LogFileMissing {
                path: self.path.clone(),
            });
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        let mut pos = if backlog > 0 {
            let bytes = tokio::fs::read(&self.path).await?;
            tail_offset(&bytes, backlog) as u64
        } else {
            file.metadata().await?.len()
        };
        file.seek(SeekFrom::Start(pos)).await?;

        tokio::pin!(stop);
        let mut buf = vec![0u8; 8192];
        loop {
            let n = file.read(&mut buf).await?;
            if n > 0 {
                out.write_all(&buf[..n]).await?;
                out.flush().await?;
                pos += n as u64;
                continue;
            }

            // Truncated underneath us: start over from the top.
            let len = tokio::fs::metadata(&self.path)
                .await
                .map(|m| m.len())
                .unwrap_or(pos);
            if len < pos {
                pos = 0;
                file.seek(SeekFrom::Start(0)).await?;
                continue;
            }

            tokio::select! {
                _ = &mut stop => return Ok(()),
                _ = tokio::time::sleep(FOLLOW_POLL) => {}
            }
        }
    }
}

/// Byte offset where the last `lines` lines of `bytes` begin.
fn tail_offset(bytes: &[u8], lines: usize) -> usize {
    if lines == 0 {
        return bytes.len();
    }
    // A trailing newline terminates the last line rather than starting a new one.
    let end = match bytes.last() {
        Some(b'\n') => bytes.len() - 1,
        _ => bytes.len(),
    };
    let mut seen = 0;
    for (i, byte) in bytes[..end].iter().enumerate().rev() {
        if *byte == b'\n' {
            seen += 1;
            if seen == lines {
                return i + 1;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_offset_counts_lines_from_end() {
        let text = b"one\ntwo\nthree\n";
        assert_eq!(&text[tail_offset(text, 1)..], b"three\n");
        assert_eq!(&text[tail_offset(text, 2)..], b"two\nthree\n");
        assert_eq!(tail_offset(text, 10), 0);
        assert_eq!(tail_offset(text, 0), text.len());
    }

    #[test]
    fn tail_offset_handles_unterminated_last_line() {
        let text = b"one\ntwo";
        assert_eq!(&text[tail_offset(text, 1)..], b"two");
        assert_eq!(tail_offset(b"", 3), 0);
    }

    #[test]
    fn open_for_run_creates_dir_and_appends_banner() {
        let tmp = tempfile::TempDir::new().unwrap();
        let sink = LogSink::new(tmp.path().join("logs").join("server.log"));

        drop(sink.open_for_run(&["python3".into(), "server.py".into()]).unwrap());
        drop(sink.open_for_run(&["python3".into(), "server.py".into()]).unwrap());

        let contents = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| l.contains("starting: python3 server.py")));
    }
}
