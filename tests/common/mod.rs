//! Shared helpers for pipeline tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use auth_gateway::cache::MemoryStore;
use auth_gateway::config::GatewayConfig;
use auth_gateway::routing::RouteRegistry;
use auth_gateway::security::SessionToken;
use auth_gateway::GatewayServer;

pub const ACCESS_KEY: &str = "integration-test-access-key";

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// A session token valid for one hour.
pub fn mint_token(id: i64, session: i64) -> String {
    SessionToken::encode(id, session, ACCESS_KEY, unix_now() + 3600)
}

/// Gateway config with admission control off; tests opt back in.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.enabled = false;
    config
}

pub fn build_router(config: GatewayConfig, routes: RouteRegistry, store: Arc<MemoryStore>) -> Router {
    GatewayServer::new(config, routes, store).into_router()
}

pub fn client_addr() -> SocketAddr {
    "127.0.0.1:50000".parse().unwrap()
}

/// Build a request carrying the synthetic client address the pipeline
/// expects from the connection.
pub fn build_request(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder.body(Body::from(body)).unwrap();
    request.extensions_mut().insert(ConnectInfo(client_addr()));
    request
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}
