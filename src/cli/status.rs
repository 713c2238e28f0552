//! CLI `status` command: state of the server and its health endpoint.

use anyhow::Result;

use membridge::{InstanceState, Supervisor};

pub async fn status(supervisor: &Supervisor) -> Result<bool> {
    let state = supervisor.status().await?;
    let health_url = supervisor.health().url();

    match state {
        InstanceState::NotRunning => {
            println!("Server is not running");
        }
        InstanceState::Stale(pid) => {
            println!("Server is not running (stale PID record {pid} removed)");
        }
        InstanceState::Running(pid) => {
            println!("Server is running (PID {pid})");
            println!("  Health:  OK ({health_url})");
            if let Some(details) = supervisor.health().details().await {
                if let Some(initialized) = details.memory_initialized {
                    let label = if initialized { "yes" } else { "no" };
                    println!("  Memory initialized: {label}");
                }
            }
        }
        InstanceState::RunningUnhealthy(pid) => {
            println!("Server is running (PID {pid})");
            println!("  Health:  FAILING ({health_url})");
            println!(
                "  Check the log at {}",
                supervisor.log_sink().path().display()
            );
        }
    }

    Ok(state.is_success())
}
