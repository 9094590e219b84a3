//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every section defaults to the production values so a minimal config works.

use serde::{Deserialize, Serialize};

/// Root configuration for the request gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Transport limits (payload size, timeouts).
    pub limits: LimitsConfig,

    /// Per-client admission control.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin resource sharing.
    pub cors: CorsConfig,

    /// Client identity checks (User-Agent gate).
    pub identity: IdentityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Transport-level limits. Timeouts apply to the whole request, not to
/// individual pipeline stages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_payload_bytes: usize,

    /// Read timeout in seconds.
    pub read_timeout_secs: u64,

    /// Write timeout in seconds.
    pub write_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 1 << 20,
            read_timeout_secs: 5,
            write_timeout_secs: 5,
        }
    }
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable admission control.
    pub enabled: bool,

    /// Tokens added to each client's bucket per second.
    pub requests_per_second: f64,

    /// Token bucket capacity (burst size).
    pub burst_size: u32,

    /// Requests allowed per client within one alive window before the
    /// client is rejected unconditionally.
    pub max_requests_per_window: u32,

    /// Janitor sweep period in seconds.
    pub sweep_interval_secs: u64,

    /// Idle time in seconds after which a client is evicted.
    pub alive_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 10.0,
            burst_size: 15,
            max_requests_per_window: 2000,
            sweep_interval_secs: 600,
            alive_window_secs: 600,
        }
    }
}

/// Cross-origin configuration. When enabled, CORS headers are attached to
/// every response and `OPTIONS` preflights are answered immediately.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable cross-origin mode.
    pub enabled: bool,

    /// Origins allowed to read responses.
    pub allowed_origins: Vec<String>,
}

/// Client identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Required User-Agent for routes that opt into the check. Empty
    /// disables the gate. A trailing "-*" makes it a prefix match.
    pub required_user_agent: String,

    /// User-Agent value that always passes the gate.
    pub dev_user_agent: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            required_user_agent: String::new(),
            dev_user_agent: "dev tool".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
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
