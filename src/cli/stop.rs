//! CLI `stop` command.

use anyhow::Result;

use membridge::Supervisor;

pub async fn stop(supervisor: &Supervisor) -> Result<bool> {
    match supervisor.stop().await {
        Ok(report) => {
            if report.forced {
                println!("Server did not exit in time; killed (PID {})", report.pid);
            } else {
                println!("Server stopped (PID {})", report.pid);
            }
            Ok(true)
        }
        Err(e) => super::report_failure(e),
    }
}
