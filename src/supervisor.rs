//! Lifecycle supervisor for the single server instance.
//!
//! Every operation reads the PID record fresh; nothing is cached between
//! invocations. Start is serialized across processes by an advisory lock
//! next to the PID file, so two racing starts produce one server and one
//! `AlreadyRunning`.

use std::future::Future;
use std::path::PathBuf;

use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::SupervisorError;
use crate::log_sink::LogSink;
use crate::pid_store::PidStore;
use crate::probe::{self, DependencyProbe, HealthProbe};
use crate::process::{self, ProcessHandle};

/// The server's state as observed at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    NotRunning,
    Running(u32),
    /// Process alive, health endpoint failing.
    RunningUnhealthy(u32),
    /// Recorded PID was dead; the record has been removed.
    Stale(u32),
}

impl InstanceState {
    /// Status succeeds whenever the process is alive, healthy or not.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Running(_) | Self::RunningUnhealthy(_))
    }

    pub fn pid(&self) -> Option<u32> {
        match self {
            Self::NotRunning => None,
            Self::Running(pid) | Self::RunningUnhealthy(pid) | Self::Stale(pid) => Some(*pid),
        }
    }
}

/// What Start found when it checked the dependency daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    Disabled,
    Reachable,
    /// Unreachable; a start was requested (or attempted) and Start went on.
    StartRequested,
}

#[derive(Debug, Clone)]
pub struct StartReport {
    pub pid: u32,
    pub log_path: PathBuf,
    pub api_url: String,
    pub docs_url: String,
    pub dependency: DependencyState,
    /// A stale record was found and replaced.
    pub replaced_stale: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopReport {
    pub pid: u32,
    /// The process ignored SIGTERM for the whole grace period.
    pub forced: bool,
}

#[derive(Debug, Clone)]
pub struct RestartReport {
    pub stopped: Option<StopReport>,
    pub started: StartReport,
}

pub struct Supervisor {
    config: BridgeConfig,
    pid_store: PidStore,
    log_sink: LogSink,
    health: HealthProbe,
    dependency: Option<DependencyProbe>,
}

impl Supervisor {
    /// Wire up the supervisor. Creates the log directory.
    pub fn new(config: BridgeConfig) -> Result<Self, SupervisorError> {
        let client = probe::http_client(config.timing.probe_timeout())?;
        let health = HealthProbe::new(client.clone(), config.server.health_url());
        let dependency = config
            .dependency
            .enabled
            .then(|| DependencyProbe::new(client, &config.dependency));

        let log_sink = LogSink::new(config.log_file_path());
        log_sink.ensure_dir()?;

        Ok(Self {
            pid_store: PidStore::new(config.pid_file_path()),
            log_sink,
            health,
            dependency,
            config,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn pid_store(&self) -> &PidStore {
        &self.pid_store
    }

    pub fn log_sink(&self) -> &LogSink {
        &self.log_sink
    }

    pub fn health(&self) -> &HealthProbe {
        &self.health
    }

    /// Ensure exactly one server process is running.
    pub async fn start(&self) -> Result<StartReport, SupervisorError> {
        let mut lock = self.pid_store.start_lock()?;
        let _guard = lock.write()?;

        let mut replaced_stale = None;
        if let Some(existing) = self.pid_store.read()? {
            if existing.is_alive() {
                return Err(SupervisorError::AlreadyRunning {
                    pid: existing.pid(),
                });
            }
            info!(pid = existing.pid(), "replacing stale PID record");
            replaced_stale = Some(existing.pid());
        }

        let dependency = self.warm_up_dependency().await;

        let command = &self.config.server.command;
        let log = self.log_sink.open_for_run(command)?;
        let handle = process::spawn_detached(
            command,
            &self.config.server.env,
            &self.config.base_dir,
            log,
        )
        .map_err(|source| SupervisorError::Spawn {
            program: command.first().cloned().unwrap_or_default(),
            source,
        })?;
        if let Err(e) = self.pid_store.write(handle) {
            // An unrecorded server would be invisible to every later command.
            self.abandon(handle).await;
            return Err(e);
        }
        info!(pid = handle.pid(), cwd = %self.config.base_dir.display(), "server spawned");

        tokio::time::sleep(self.config.timing.start_settle()).await;

        match self.pid_store.read()? {
            Some(recorded) if recorded.is_alive() => Ok(StartReport {
                pid: recorded.pid(),
                log_path: self.log_sink.path().to_path_buf(),
                api_url: self.config.server.api_url(),
                docs_url: self.config.server.docs_url(),
                dependency,
                replaced_stale,
            }),
            _ => {
                warn!(pid = handle.pid(), "server exited during startup");
                self.pid_store.clear()?;
                Err(SupervisorError::SpawnFailed {
                    log_path: self.log_sink.path().to_path_buf(),
                })
            }
        }
    }

    /// Best-effort: if the dependency is down, ask the service manager to
    /// start it and wait a fixed settle delay. Never blocks Start.
    async fn warm_up_dependency(&self) -> DependencyState {
        let Some(dependency) = &self.dependency else {
            return DependencyState::Disabled;
        };
        if dependency.is_reachable().await {
            debug!(name = dependency.name(), "dependency reachable");
            return DependencyState::Reachable;
        }

        let err = SupervisorError::DependencyUnreachable {
            name: dependency.name().to_string(),
            url: dependency.url().to_string(),
        };
        warn!("{err}, requesting start");
        dependency.request_start();
        tokio::time::sleep(self.config.timing.dependency_settle()).await;
        DependencyState::StartRequested
    }

    /// SIGTERM, poll for exit, SIGKILL if the grace period runs out. The
    /// record is removed once the sequence completes either way.
    pub async fn stop(&self) -> Result<StopReport, SupervisorError> {
        let Some(handle) = self.pid_store.read()? else {
            return Err(SupervisorError::NotRunning);
        };
        if !handle.is_alive() {
            self.pid_store.clear()?;
            return Err(SupervisorError::StaleRecord { pid: handle.pid() });
        }

        info!(pid = handle.pid(), "sending SIGTERM");
        handle.terminate().map_err(|source| SupervisorError::Signal {
            pid: handle.pid(),
            source,
        })?;

        let mut forced = false;
        if !self.wait_for_exit(handle).await {
            warn!(
                pid = handle.pid(),
                attempts = self.config.timing.stop_poll_attempts,
                "server ignored SIGTERM, sending SIGKILL"
            );
            handle.kill().map_err(|source| SupervisorError::Signal {
                pid: handle.pid(),
                source,
            })?;
            forced = true;
            if !self.wait_for_exit(handle).await {
                warn!(pid = handle.pid(), "process still present after SIGKILL");
            }
        }

        self.pid_store.clear()?;
        info!(pid = handle.pid(), forced, "server stopped");
        Ok(StopReport {
            pid: handle.pid(),
            forced,
        })
    }

    /// Kill a server that could not be recorded and wait for it to go.
    async fn abandon(&self, handle: ProcessHandle) {
        warn!(pid = handle.pid(), "could not record PID, killing server");
        if let Err(e) = handle.kill() {
            warn!(pid = handle.pid(), error = %e, "failed to kill unrecorded server");
            return;
        }
        if !self.wait_for_exit(handle).await {
            warn!(pid = handle.pid(), "unrecorded server still present after SIGKILL");
        }
    }

    /// Bounded polling; true once the process is gone.
    async fn wait_for_exit(&self, handle: ProcessHandle) -> bool {
        for _ in 0..self.config.timing.stop_poll_attempts {
            if !handle.is_alive() {
                return true;
            }
            tokio::time::sleep(self.config.timing.stop_poll_interval()).await;
        }
        !handle.is_alive()
    }

    /// Report the current state. Only mutates the record to clear a stale one.
    pub async fn status(&self) -> Result<InstanceState, SupervisorError> {
        let Some(handle) = self.pid_store.read()? else {
            return Ok(InstanceState::NotRunning);
        };
        if !handle.is_alive() {
            self.pid_store.clear()?;
            return Ok(InstanceState::Stale(handle.pid()));
        }
        if self.health.check().await {
            Ok(InstanceState::Running(handle.pid()))
        } else {
            Ok(InstanceState::RunningUnhealthy(handle.pid()))
        }
    }

    /// Stop (a missing or stale server is fine), pause, then Start. A failed
    /// Start leaves the server fully stopped.
    pub async fn restart(&self) -> Result<RestartReport, SupervisorError> {
        let stopped = match self.stop().await {
            Ok(report) => Some(report),
            Err(SupervisorError::NotRunning) | Err(SupervisorError::StaleRecord { .. }) => None,
            Err(e) => return Err(e),
        };

        tokio::time::sleep(self.config.timing.restart_delay()).await;

        let started = self.start().await?;
        Ok(RestartReport { stopped, started })
    }

    /// Stream the server log until `stop` resolves.
    pub async fn logs<W, S>(
        &self,
        out: &mut W,
        backlog: usize,
        stop: S,
    ) -> Result<(), SupervisorError>
    where
        W: AsyncWrite + Unpin,
        S: Future<Output = ()>,
    {
        self.log_sink.follow(out, backlog, stop).await
    }
}
