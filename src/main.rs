mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use membridge::config::BridgeConfig;
use membridge::Supervisor;

#[derive(Parser)]
#[command(
    name = "membridge",
    version,
    about = "Supervisor for the local memory bridge server",
    arg_required_else_help = true
)]
struct Cli {
    /// Base directory holding config.toml, the PID file and logs
    /// (default: $MEMBRIDGE_HOME or ~/.membridge)
    #[arg(long, global = true, value_name = "PATH")]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server in the background (no-op if already running)
    Start,
    /// Stop the server, forcefully if it ignores SIGTERM
    Stop,
    /// Report whether the server is running and healthy
    Status,
    /// Stop then start the server
    Restart,
    /// Follow the server log until interrupted
    Logs {
        /// Print the last N lines before following
        #[arg(short = 'n', long, default_value_t = 0)]
        lines: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = BridgeConfig::load(cli.base_dir.as_deref())?;

    // Diagnostics go to stderr; stdout carries the command's report.
    let filter = EnvFilter::try_new(&config.supervisor.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let supervisor = Supervisor::new(config)?;

    let ok = match cli.command {
        Command::Start => cli::start::start(&supervisor).await?,
        Command::Stop => cli::stop::stop(&supervisor).await?,
        Command::Status => cli::status::status(&supervisor).await?,
        Command::Restart => cli::restart::restart(&supervisor).await?,
        Command::Logs { lines } => cli::logs::logs(&supervisor, lines).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
