//! Configuration loading from `<base_dir>/config.toml` and environment variables.
//!
//! The base directory is the supervisor's home: it holds the config file, the
//! PID file, the log directory, and is the working directory of the spawned
//! server.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeConfig {
    /// Resolved base directory. Not read from the file.
    #[serde(skip)]
    pub base_dir: PathBuf,
    pub supervisor: SupervisorConfig,
    pub server: ServerConfig,
    pub dependency: DependencyConfig,
    pub paths: PathsConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SupervisorConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    pub host: String,
    pub port: u16,
    pub health_path: String,
    pub docs_path: String,
    /// Extra environment for the server process.
    pub env: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DependencyConfig {
    pub enabled: bool,
    /// Service name handed to the service manager.
    pub name: String,
    pub url: String,
    pub service_manager: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub pid_file: String,
    pub log_dir: String,
    pub log_file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingConfig {
    pub start_settle_ms: u64,
    pub dependency_settle_ms: u64,
    pub stop_poll_interval_ms: u64,
    pub stop_poll_attempts: u32,
    pub restart_delay_ms: u64,
    pub probe_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            supervisor: SupervisorConfig::default(),
            server: ServerConfig::default(),
            dependency: DependencyConfig::default(),
            paths: PathsConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".into(), "server.py".into()],
            host: "127.0.0.1".into(),
            port: 8000,
            health_path: "/health".into(),
            docs_path: "/docs".into(),
            env: HashMap::from([("PYTHONUNBUFFERED".to_string(), "1".to_string())]),
        }
    }
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            name: "ollama".into(),
            url: "http://127.0.0.1:11434/api/tags".into(),
            service_manager: vec!["brew".into(), "services".into(), "start".into()],
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pid_file: ".server.pid".into(),
            log_dir: "logs".into(),
            log_file: "server.log".into(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_settle_ms: 2000,
            dependency_settle_ms: 3000,
            stop_poll_interval_ms: 1000,
            stop_poll_attempts: 10,
            restart_delay_ms: 1000,
            probe_timeout_ms: 2000,
        }
    }
}

impl TimingConfig {
    pub fn start_settle(&self) -> Duration {
        Duration::from_millis(self.start_settle_ms)
    }

    pub fn dependency_settle(&self) -> Duration {
        Duration::from_millis(self.dependency_settle_ms)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl ServerConfig {
    /// Root URL of the server's API.
    pub fn api_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.api_url(), self.health_path)
    }

    pub fn docs_url(&self) -> String {
        format!("{}{}", self.api_url(), self.docs_path)
    }
}

/// Returns `~/.membridge/`
pub fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".membridge")
}

/// Resolve the base directory: explicit flag, then `MEMBRIDGE_HOME`, then the default.
pub fn resolve_base_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return expand_tilde(&dir.to_string_lossy());
    }
    match std::env::var("MEMBRIDGE_HOME") {
        Ok(val) if !val.is_empty() => expand_tilde(&val),
        _ => default_base_dir(),
    }
}

impl BridgeConfig {
    /// Load config for the given base directory override.
    pub fn load(base_dir: Option<&Path>) -> Result<Self> {
        Self::load_from(resolve_base_dir(base_dir))
    }

    /// Load `<base_dir>/config.toml` (if it exists), then apply env var overrides.
    pub fn load_from(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let path = base_dir.join("config.toml");
        let mut config: BridgeConfig = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config TOML {}", path.display()))?
        } else {
            info!("no config file at {}, using defaults", path.display());
            BridgeConfig::default()
        };
        config.base_dir = base_dir;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (MEMBRIDGE_LOG_LEVEL, MEMBRIDGE_PORT, MEMBRIDGE_SERVER_CMD).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("MEMBRIDGE_LOG_LEVEL") {
            self.supervisor.log_level = val;
        }
        if let Ok(val) = std::env::var("MEMBRIDGE_PORT") {
            self.server.port = val
                .trim()
                .parse()
                .with_context(|| format!("MEMBRIDGE_PORT is not a valid port: {val}"))?;
        }
        if let Ok(val) = std::env::var("MEMBRIDGE_SERVER_CMD") {
            self.server.command = val.split_whitespace().map(str::to_string).collect();
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.server.command.is_empty(), "server.command must not be empty");
        ensure!(self.server.port != 0, "server.port must be non-zero");
        ensure!(
            self.timing.stop_poll_attempts >= 1,
            "timing.stop_poll_attempts must be at least 1"
        );
        Ok(())
    }

    pub fn pid_file_path(&self) -> PathBuf {
        self.resolve(&self.paths.pid_file)
    }

    pub fn log_dir_path(&self) -> PathBuf {
        self.resolve(&self.paths.log_dir)
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir_path().join(&self.paths.log_file)
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let expanded = expand_tilde(path);
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir.join(expanded)
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
