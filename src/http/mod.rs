//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, per-pattern routes, layers)
//!     → pipeline.rs (admission, gates, dispatch, formatting)
//!     → envelope.rs (wire shapes in and out)
//!     → Send to client
//! ```

pub mod envelope;
pub mod pipeline;
pub mod server;

pub use envelope::{RequestEnvelope, ResponseEnvelope, STATE_OK};
pub use server::{GatewayServer, GatewayState};
