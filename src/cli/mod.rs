//! Terminal front-end for the supervisor commands.
//!
//! Each command prints its report to stdout and returns the success
//! disposition that becomes the exit code. Anticipated failures are printed
//! with their next action; anything else propagates as an error.

pub mod logs;
pub mod restart;
pub mod start;
pub mod status;
pub mod stop;

use anyhow::Result;

use membridge::config::BridgeConfig;
use membridge::supervisor::{DependencyState, StartReport};
use membridge::SupervisorError;

/// Print an anticipated failure and return `false`; re-raise anything else.
fn report_failure(err: SupervisorError) -> Result<bool> {
    if !err.is_expected() {
        return Err(err.into());
    }
    println!("{err}");
    if let Some(hint) = err.hint() {
        println!("  {hint}");
    }
    Ok(false)
}

fn print_started(report: &StartReport, config: &BridgeConfig) {
    if let Some(stale) = report.replaced_stale {
        println!("Removed stale PID record ({stale})");
    }
    match report.dependency {
        DependencyState::Disabled | DependencyState::Reachable => {}
        DependencyState::StartRequested => {
            println!(
                "Warning: {} was not reachable at {}; requested a start and continued",
                config.dependency.name, config.dependency.url
            );
        }
    }
    println!("Server started (PID {})", report.pid);
    println!("  Logs:  {}", report.log_path.display());
    println!("  API:   {}", report.api_url);
    println!("  Docs:  {}", report.docs_url);
}
