//! Configuration validation.
//!
//! Serde handles syntactic validity; this module checks semantics. All
//! violations are collected and returned together rather than failing on
//! the first one.

use crate::config::schema::GatewayConfig;

/// A single semantic violation found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

fn violation(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

/// Validate a configuration. Pure function: returns every violation found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.is_empty() {
        errors.push(violation("listener.bind_address", "must not be empty"));
    }

    if config.limits.max_payload_bytes == 0 {
        errors.push(violation("limits.max_payload_bytes", "must be greater than zero"));
    }
    if config.limits.read_timeout_secs == 0 {
        errors.push(violation("limits.read_timeout_secs", "must be greater than zero"));
    }
    if config.limits.write_timeout_secs == 0 {
        errors.push(violation("limits.write_timeout_secs", "must be greater than zero"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second <= 0.0 {
            errors.push(violation(
                "rate_limit.requests_per_second",
                "must be positive when rate limiting is enabled",
            ));
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(violation(
                "rate_limit.burst_size",
                "must be positive when rate limiting is enabled",
            ));
        }
        if config.rate_limit.alive_window_secs == 0 {
            errors.push(violation("rate_limit.alive_window_secs", "must be greater than zero"));
        }
        if config.rate_limit.sweep_interval_secs == 0 {
            errors.push(violation("rate_limit.sweep_interval_secs", "must be greater than zero"));
        }
    }

    if config.cors.enabled && config.cors.allowed_origins.is_empty() {
        errors.push(violation(
            "cors.allowed_origins",
            "at least one origin is required when cors is enabled",
        ));
    }

    // A lone wildcard would make the prefix empty and match everything.
    if config.identity.required_user_agent == "-*" {
        errors.push(violation(
            "identity.required_user_agent",
            "wildcard requires a non-empty prefix",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
