//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check URLs parse and use http(s)
//! - Validate value ranges (timeouts, capacities, backoff bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - A missing SSE URL is allowed; sessions then end immediately

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{BackoffStrategy, RelayConfig, SameSite};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("backoff: base_delay_ms ({base}) exceeds max_delay_ms ({max})")]
    BackoffRange { base: u64, max: u64 },

    #[error("auth: cookie_name '{0}' is not a valid cookie name")]
    CookieName(String),

    #[error("auth: cookie_same_site = \"none\" requires cookie_secure")]
    InsecureSameSiteNone,
}

pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    check_url(&mut errors, "upstream.sse_url", config.upstream.sse_url.as_deref());
    check_url(&mut errors, "upstream.api_url", config.upstream.api_url.as_deref());

    let positive = [
        ("upstream.connect_timeout_secs", config.upstream.connect_timeout_secs),
        ("upstream.request_timeout_secs", config.upstream.request_timeout_secs),
        ("relay.channel_capacity", config.relay.channel_capacity as u64),
        ("relay.keep_alive_secs", config.relay.keep_alive_secs),
        ("relay.max_frame_bytes", config.relay.max_frame_bytes as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    match config.backoff.strategy {
        BackoffStrategy::Fixed => {
            if config.backoff.delay_ms == 0 {
                errors.push(ValidationError::Zero { field: "backoff.delay_ms" });
            }
        }
        BackoffStrategy::Exponential => {
            if config.backoff.base_delay_ms == 0 {
                errors.push(ValidationError::Zero { field: "backoff.base_delay_ms" });
            } else if config.backoff.base_delay_ms > config.backoff.max_delay_ms {
                errors.push(ValidationError::BackoffRange {
                    base: config.backoff.base_delay_ms,
                    max: config.backoff.max_delay_ms,
                });
            }
        }
    }

    let name = &config.auth.cookie_name;
    let valid_name = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.');
    if !valid_name {
        errors.push(ValidationError::CookieName(name.clone()));
    }
    if config.auth.cookie_same_site == SameSite::None && !config.auth.cookie_secure {
        errors.push(ValidationError::InsecureSameSiteNone);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: Option<&str>) {
    let Some(value) = value else { return };
    let ok = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}
