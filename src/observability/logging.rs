//! Structured logging.
//!
//! Uses `tracing` throughout; the env filter wins over the configured
//! level so operators can raise verbosity without touching the config.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. `default_level` applies when
/// `RUST_LOG` is unset.
pub fn init_logging(default_level: &str) {
    let fallback = format!("auth_gateway={default_level},tower_http=warn");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
