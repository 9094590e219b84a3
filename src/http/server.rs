//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router, one route per registered pattern
//! - Wire up middleware (tracing, request ID, transport timeout)
//! - Start the client-registry janitor
//! - Bind to a listener and serve with graceful shutdown
//!
//! Route metadata is captured by closure at assembly time, so the pipeline
//! receives its `Route` without a per-request registry lookup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::cache::{CacheStore, ResponseCache};
use crate::config::GatewayConfig;
use crate::http::pipeline;
use crate::routing::RouteRegistry;
use crate::security::ClientRegistry;

/// Shared state injected into every request task. The client registry is
/// the only mutable piece; everything else is read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub clients: Arc<ClientRegistry>,
    pub cache: Arc<ResponseCache>,
}

/// The request gateway server.
pub struct GatewayServer {
    router: Router,
    config: Arc<GatewayConfig>,
    clients: Arc<ClientRegistry>,
    route_count: usize,
}

impl GatewayServer {
    /// Assemble the server from a validated config, a populated route
    /// registry, and a cache store.
    pub fn new(config: GatewayConfig, routes: RouteRegistry, store: Arc<dyn CacheStore>) -> Self {
        let config = Arc::new(config);
        let clients = Arc::new(ClientRegistry::new(&config.rate_limit));
        let state = GatewayState {
            config: config.clone(),
            clients: clients.clone(),
            cache: Arc::new(ResponseCache::new(store)),
        };

        let route_count = routes.len();
        let router = Self::build_router(&config, &routes, state);
        Self {
            router,
            config,
            clients,
            route_count,
        }
    }

    fn build_router(config: &GatewayConfig, routes: &RouteRegistry, state: GatewayState) -> Router {
        let mut router = Router::new();
        for (pattern, route) in routes.iter() {
            let state = state.clone();
            let route = route.clone();
            router = router.route(
                pattern,
                any(move |ConnectInfo(addr): ConnectInfo<SocketAddr>, request: Request<Body>| {
                    pipeline::handle(state.clone(), route.clone(), addr, request)
                }),
            );
        }

        // One transport-level deadline for the whole request; pipeline
        // stages are not individually timed.
        let request_timeout =
            Duration::from_secs(config.limits.read_timeout_secs + config.limits.write_timeout_secs);

        router
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.route_count,
            rate = self.config.rate_limit.requests_per_second,
            burst = self.config.rate_limit.burst_size,
            "gateway listening"
        );

        if self.config.rate_limit.enabled {
            self.clients
                .spawn_janitor(Duration::from_secs(self.config.rate_limit.sweep_interval_secs));
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("gateway stopped");
        Ok(())
    }

    /// The assembled router, for in-process exercising in tests.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
