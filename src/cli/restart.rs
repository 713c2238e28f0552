//! CLI `restart` command.

use anyhow::Result;

use membridge::Supervisor;

pub async fn restart(supervisor: &Supervisor) -> Result<bool> {
    println!("Restarting server...");
    match supervisor.restart().await {
        Ok(report) => {
            match report.stopped {
                Some(stopped) if stopped.forced => {
                    println!("Previous server killed (PID {})", stopped.pid)
                }
                Some(stopped) => println!("Previous server stopped (PID {})", stopped.pid),
                None => println!("No server was running"),
            }
            super::print_started(&report.started, supervisor.config());
            Ok(true)
        }
        Err(e) => super::report_failure(e),
    }
}
