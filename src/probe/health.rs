//! Liveness check of the supervised server's HTTP health endpoint.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Fields the server reports on its health endpoint. All optional: any
/// server answering 2xx is healthy, the body is informational.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HealthDetails {
    pub status: Option<String>,
    pub memory_initialized: Option<bool>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
    url: String,
}

impl HealthProbe {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// True iff the health endpoint answered 2xx within the timeout.
    pub async fn check(&self) -> bool {
        super::get_ok(&self.client, &self.url).await
    }

    /// Decode the health body. `None` on any failure, including a
    /// non-JSON body from an otherwise healthy server.
    pub async fn details(&self) -> Option<HealthDetails> {
        let response = self.client.get(&self.url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        match response.json::<HealthDetails>().await {
            Ok(details) => Some(details),
            Err(e) => {
                debug!(url = %self.url, error = %e, "health body is not the expected JSON");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::probe::testing::{closed_url, spawn_responder};

    fn probe(base: &str) -> HealthProbe {
        let client = crate::probe::http_client(Duration::from_millis(500)).unwrap();
        HealthProbe::new(client, format!("{base}/health"))
    }

    #[tokio::test]
    async fn healthy_on_200() {
        let (url, _server) = spawn_responder(
            "200 OK",
            r#"{"status":"healthy","memory_initialized":true,"user_id":"me"}"#,
        )
        .await;
        let probe = probe(&url);

        assert!(probe.check().await);
        let details = probe.details().await.unwrap();
        assert_eq!(details.status.as_deref(), Some("healthy"));
        assert_eq!(details.memory_initialized, Some(true));
    }

    #[tokio::test]
    async fn unhealthy_on_503() {
        let (url, _server) = spawn_responder("503 Service Unavailable", "{}").await;
        let probe = probe(&url);

        assert!(!probe.check().await);
        assert!(probe.details().await.is_none());
    }

    #[tokio::test]
    async fn refused_connection_is_false_not_error() {
        let probe = probe(&closed_url().await);
        assert!(!probe.check().await);
        assert!(probe.details().await.is_none());
    }

    #[tokio::test]
    async fn non_json_body_still_counts_as_healthy() {
        let (url, _server) = spawn_responder("200 OK", "ok").await;
        let probe = probe(&url);

        assert!(probe.check().await);
        assert!(probe.details().await.is_none());
    }
}
