//! Request gateway binary.
//!
//! Loads configuration from the path in `GATEWAY_CONFIG` (defaults apply
//! when unset), registers the application routes, and serves.

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use auth_gateway::config::{load_config, GatewayConfig};
use auth_gateway::observability::{init_logging, metrics};
use auth_gateway::routing::{Handler, HandlerPayload, Route, RouteRegistry};
use auth_gateway::{GatewayServer, HandlerError, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("GATEWAY_CONFIG") {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) => GatewayConfig::default(),
    };

    init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_payload_bytes = config.limits.max_payload_bytes,
        rate_limit_enabled = config.rate_limit.enabled,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(err) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %err,
                "failed to parse metrics address"
            ),
        }
    }

    let mut routes = RouteRegistry::new();
    routes.register(
        Route::new(
            "/ping",
            Handler::default_fn(|_identity, _body| async {
                Ok(HandlerPayload::Bytes(b"pong".to_vec()))
            }),
        )
        .raw_output()
        .content_type("text/plain"),
    )?;
    routes.register(
        Route::new(
            "/echo",
            Handler::default_fn(|_identity, body| async move {
                let value: serde_json::Value = serde_json::from_slice(&body)
                    .map_err(|err| HandlerError::new(err.to_string()))?;
                Ok(HandlerPayload::Structured(value))
            }),
        )
        .with_auth()
        .with_cache()
        .min_version(1),
    )?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config, routes, Arc::new(MemoryStore::new()));
    server.run(listener).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
