//! Readiness check and best-effort starter for the external dependency
//! daemon (the local inference service). The supervisor observes this
//! daemon but never owns it: no PID tracking, no stop.

use std::process::{Command, Stdio};

use reqwest::Client;
use tracing::{info, warn};

use crate::config::DependencyConfig;

#[derive(Debug, Clone)]
pub struct DependencyProbe {
    client: Client,
    name: String,
    url: String,
    service_manager: Vec<String>,
}

impl DependencyProbe {
    pub fn new(client: Client, config: &DependencyConfig) -> Self {
        Self {
            client,
            name: config.name.clone(),
            url: config.url.clone(),
            service_manager: config.service_manager.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn is_reachable(&self) -> bool {
        super::get_ok(&self.client, &self.url).await
    }

    /// Ask the OS service manager to start the daemon. Fire-and-forget: the
    /// manager is launched and not waited on. Returns whether the request
    /// could be issued at all.
    pub fn request_start(&self) -> bool {
        let Some((program, args)) = self.service_manager.split_first() else {
            warn!(name = %self.name, "no service manager configured, not starting dependency");
            return false;
        };

        let spawned = Command::new(program)
            .args(args)
            .arg(&self.name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                info!(
                    name = %self.name,
                    manager = %program,
                    pid = child.id(),
                    "requested dependency start"
                );
                true
            }
            Err(e) => {
                warn!(
                    name = %self.name,
                    manager = %program,
                    error = %e,
                    "could not run service manager"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::{closed_url, spawn_responder};

    fn client() -> Client {
        crate::probe::http_client(std::time::Duration::from_millis(500)).unwrap()
    }

    fn config(url: String, service_manager: &[&str]) -> DependencyConfig {
        DependencyConfig {
            enabled: true,
            name: "ollama".into(),
            url,
            service_manager: service_manager.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn reachable_when_daemon_answers() {
        let (url, _server) = spawn_responder("200 OK", r#"{"models":[]}"#).await;
        let probe = DependencyProbe::new(client(), &config(url, &["true"]));
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn unreachable_when_nothing_listens() {
        let probe = DependencyProbe::new(client(), &config(closed_url().await, &["true"]));
        assert!(!probe.is_reachable().await);
    }

    #[test]
    fn request_start_runs_service_manager() {
        let probe = DependencyProbe::new(
            client(),
            &config("http://127.0.0.1:1".into(), &["true", "services", "start"]),
        );
        assert!(probe.request_start());
    }

    #[test]
    fn request_start_tolerates_missing_manager() {
        let probe = DependencyProbe::new(
            client(),
            &config("http://127.0.0.1:1".into(), &["/nonexistent/service-manager"]),
        );
        assert!(!probe.request_start());

        let probe = DependencyProbe::new(client(), &config("http://127.0.0.1:1".into(), &[]));
        assert!(!probe.request_start());
    }
}
