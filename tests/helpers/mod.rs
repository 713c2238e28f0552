#![allow(dead_code)]

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use membridge::config::{BridgeConfig, TimingConfig};
use membridge::process::ProcessHandle;
use serde_json::json;
use tokio::task::JoinHandle;

/// Config rooted at `base` running `command`, with the dependency probe off,
/// a free health port and timings short enough for tests.
pub fn test_config(base: &Path, command: &[&str]) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.base_dir = base.to_path_buf();
    config.server.command = command.iter().map(|s| s.to_string()).collect();
    config.server.env.clear();
    config.server.port = unused_port();
    config.dependency.enabled = false;
    config.timing = TimingConfig {
        start_settle_ms: 300,
        dependency_settle_ms: 50,
        stop_poll_interval_ms: 100,
        stop_poll_attempts: 10,
        restart_delay_ms: 50,
        probe_timeout_ms: 500,
    };
    config
}

/// A long-running server stand-in.
pub const SLEEPER: &[&str] = &["sleep", "30"];

/// A server stand-in that ignores SIGTERM.
pub const STUBBORN: &[&str] = &["sh", "-c", "trap '' TERM; while :; do sleep 1; done"];

/// A server stand-in that dies right away.
pub const CRASHER: &[&str] = &["sh", "-c", "echo boom >&2; exit 1"];

pub fn unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A PID no process holds. Above `pid_max` where the kernel exposes it,
/// so parallel tests can never be handed the same number.
pub fn dead_pid() -> u32 {
    if let Some(max) = std::fs::read_to_string("/proc/sys/kernel/pid_max")
        .ok()
        .and_then(|s| s.trim().parse::<u32>().ok())
    {
        return max + 1;
    }
    loop {
        let mut child = Command::new("true").spawn().unwrap();
        child.wait().unwrap();
        if !is_alive(child.id()) {
            return child.id();
        }
    }
}

/// PIDs of live processes whose argv is exactly `argv`, read from `/proc`.
pub fn pids_running(argv: &[&str]) -> Vec<u32> {
    let wanted: Vec<u8> = argv.iter().flat_map(|a| a.bytes().chain([0])).collect();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok()?.file_name().to_str()?.parse::<u32>().ok())
        .filter(|pid| {
            std::fs::read(format!("/proc/{pid}/cmdline")).is_ok_and(|c| c == wanted)
        })
        .collect()
}

pub fn is_alive(pid: u32) -> bool {
    ProcessHandle::new(pid).unwrap().is_alive()
}

/// Poll until `pid` is gone or `timeout` passes.
pub async fn wait_gone(pid: u32, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    !is_alive(pid)
}

/// Serve a health endpoint shaped like the memory server's on `port`.
pub async fn serve_health(port: u16) -> JoinHandle<()> {
    let router = Router::new().route(
        "/health",
        get(|| async {
            Json(json!({
                "status": "healthy",
                "memory_initialized": true,
                "user_id": "tester",
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    })
}
