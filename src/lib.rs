//! Authenticated, cached, rate-limited HTTP request gateway.
//!
//! The gateway terminates inbound requests and runs each through a
//! sequential pipeline: per-client admission control, CORS policy,
//! User-Agent checks, body decoding, version and signature gates, an
//! optional response-cache short-circuit, and dispatch to one of a closed
//! set of handler shapes.
//!
//! ```text
//!  request ──▶ admission ──▶ transport policy ──▶ identity/auth gates
//!                                                       │
//!                cache write ◀── formatting ◀── dispatch ◀── cache probe
//! ```
//!
//! Registries (routes, clients) and the cache adapter are constructed once
//! and passed into the pipeline by reference, never held as globals, so
//! tests can inject fakes for each.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod cache;
pub mod error;
pub mod observability;
pub mod security;

pub use cache::{CacheStore, MemoryStore, ResponseCache};
pub use config::GatewayConfig;
pub use error::{GatewayError, HandlerError};
pub use http::{GatewayServer, ResponseEnvelope};
pub use routing::{Handler, HandlerPayload, Route, RouteRegistry};
pub use security::{ClientRegistry, SessionToken};
