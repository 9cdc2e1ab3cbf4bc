//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_sessions_active` (gauge): sessions currently running
//! - `relay_upstream_connects_total` (counter): connect attempts by outcome
//! - `relay_frames_forwarded_total` (counter): frames delivered downstream
//! - `relay_backoffs_total` (counter): backoff entries by reason
//! - `http_requests_total` (counter): requests by route, status
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const SESSIONS_ACTIVE: &str = "relay_sessions_active";
pub const UPSTREAM_CONNECTS: &str = "relay_upstream_connects_total";
pub const FRAMES_FORWARDED: &str = "relay_frames_forwarded_total";
pub const BACKOFFS: &str = "relay_backoffs_total";
pub const HTTP_REQUESTS: &str = "http_requests_total";

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

/// Counts a running session for as long as it is alive.
pub struct ActiveSession(());

impl ActiveSession {
    pub fn enter() -> Self {
        gauge!(SESSIONS_ACTIVE).increment(1.0);
        Self(())
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        gauge!(SESSIONS_ACTIVE).decrement(1.0);
    }
}

pub fn record_connect(outcome: &'static str) {
    counter!(UPSTREAM_CONNECTS, "outcome" => outcome).increment(1);
}

pub fn record_frame_forwarded() {
    counter!(FRAMES_FORWARDED).increment(1);
}

pub fn record_backoff(reason: &'static str) {
    counter!(BACKOFFS, "reason" => reason).increment(1);
}

pub fn record_request(route: &str, status: u16) {
    counter!(HTTP_REQUESTS, "route" => route.to_string(), "status" => status.to_string()).increment(1);
}
