//! Process supervisor for the local memory bridge server.
//!
//! `membridge` keeps exactly one instance of the memory server running. It
//! starts the server as a detached process, tracks it through a PID file,
//! stops it gracefully (escalating to SIGKILL), reports whether it is alive
//! and answering its health endpoint, and tails its log. The inference
//! daemon the server depends on is probed before each start and, if absent,
//! started through the OS service manager on a best-effort basis.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files and environment variables
//! - [`supervisor`] - The start/stop/status/restart/logs state machine
//! - [`pid_store`] - Single-slot PID record and the start lock
//! - [`process`] - PID liveness, signals, and detached spawning
//! - [`probe`] - HTTP health and dependency readiness probes
//! - [`log_sink`] - The server's append-only log and log following
//! - [`error`] - The supervisor's error taxonomy

pub mod config;
pub mod error;
pub mod log_sink;
pub mod pid_store;
pub mod probe;
pub mod process;
pub mod supervisor;

pub use error::SupervisorError;
pub use supervisor::{InstanceState, Supervisor};
