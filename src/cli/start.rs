//! CLI `start` command.

use anyhow::Result;

use membridge::{Supervisor, SupervisorError};

pub async fn start(supervisor: &Supervisor) -> Result<bool> {
    println!("Starting server...");
    match supervisor.start().await {
        Ok(report) => {
            super::print_started(&report, supervisor.config());
            Ok(true)
        }
        Err(SupervisorError::AlreadyRunning { pid }) => {
            println!("Server is already running (PID {pid})");
            Ok(false)
        }
        Err(e) => super::report_failure(e),
    }
}
