//! CLI `logs` command: follow the server log until Ctrl-C.

use anyhow::Result;

use membridge::{Supervisor, SupervisorError};

pub async fn logs(supervisor: &Supervisor, lines: usize) -> Result<bool> {
    let sink = supervisor.log_sink();
    if !sink.exists() {
        return super::report_failure(SupervisorError::LogFileMissing {
            path: sink.path().to_path_buf(),
        });
    }
    eprintln!("Following {} (Ctrl-C to stop)", sink.path().display());

    let mut stdout = tokio::io::stdout();
    let interrupted = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    match supervisor.logs(&mut stdout, lines, interrupted).await {
        Ok(()) => Ok(true),
        Err(e) => super::report_failure(e),
    }
}
