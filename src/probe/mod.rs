//! HTTP reachability probes.
//!
//! Both probes issue a single bounded-timeout GET and collapse every
//! transport failure (refused connection, timeout, bad response) into
//! "not reachable". Neither ever returns a lower-level error to the caller.

pub mod dependency;
pub mod health;

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

pub use dependency::DependencyProbe;
pub use health::{HealthDetails, HealthProbe};

/// Build the HTTP client shared by the probes. Probe targets are local,
/// so proxy settings from the environment are ignored.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).no_proxy().build()
}

/// GET `url` and report whether it answered with a 2xx status.
async fn get_ok(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            debug!(url, status = %response.status(), "probe got non-success status");
            false
        }
        Err(e) => {
            debug!(url, error = %e, "probe request failed");
            false
        }
    }
}
