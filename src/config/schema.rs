//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::backoff::BackoffPolicy;

/// Root configuration for the dashboard relay.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend endpoints the relay and loaders talk to.
    pub upstream: UpstreamConfig,

    /// Per-session relay tuning.
    pub relay: SessionConfig,

    /// Reconnect delay settings.
    pub backoff: BackoffConfig,

    /// Dashboard session cookie settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Backend (controller) endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// SSE endpoint relayed to dashboard clients. Unset disables the relay.
    pub sse_url: Option<String>,

    /// Base URL of the REST API the loaders read from.
    pub api_url: Option<String>,

    /// Bearer token sent to both the SSE endpoint and the REST API.
    pub api_token: Option<String>,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Longest silence on an open event stream before reconnecting (0 = never).
    pub idle_read_timeout_secs: u64,

    /// Total timeout for REST loader requests in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            sse_url: None,
            api_url: None,
            api_token: None,
            connect_timeout_secs: 5,
            idle_read_timeout_secs: 60,
            request_timeout_secs: 10,
        }
    }
}

/// Per-session relay settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Events buffered between a session and its client.
    pub channel_capacity: usize,

    /// Interval of keep-alive comments sent to the client, in seconds.
    pub keep_alive_secs: u64,

    /// Largest unterminated upstream event accepted, in bytes.
    pub max_frame_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            keep_alive_secs: 15,
            max_frame_bytes: crate::sse::decoder::DEFAULT_MAX_BUFFER,
        }
    }
}

/// Backoff strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

/// Reconnect delay configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub strategy: BackoffStrategy,

    /// Delay for the fixed strategy in milliseconds.
    pub delay_ms: u64,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Fixed,
            delay_ms: 5000,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        match self.strategy {
            BackoffStrategy::Fixed => BackoffPolicy::Fixed(Duration::from_millis(self.delay_ms)),
            BackoffStrategy::Exponential => BackoffPolicy::Exponential {
                base: Duration::from_millis(self.base_delay_ms),
                max: Duration::from_millis(self.max_delay_ms),
            },
        }
    }
}

/// Dashboard login configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret a user logs in with. Unset leaves the dashboard open.
    pub dashboard_secret: Option<String>,

    /// Name of the session cookie.
    pub cookie_name: String,

    /// Mark the cookie `Secure` (HTTPS only).
    pub cookie_secure: bool,

    /// `SameSite` attribute of the session cookie.
    pub cookie_same_site: SameSite,

    /// Cookie lifetime in seconds.
    pub cookie_max_age_secs: u64,
}

/// Cookie `SameSite` policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Attribute value as written in `Set-Cookie`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dashboard_secret: None,
            cookie_name: "relay_session".to_string(),
            cookie_secure: false,
            cookie_same_site: SameSite::Strict,
            cookie_max_age_secs: 7 * 24 * 60 * 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
