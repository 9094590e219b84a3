//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client admission)
//!     → token.rs (decode session token when the route requires auth)
//!     → signature.rs (verify Content-Sign over the raw body)
//!     → Pass to dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - Auth rejections are indistinguishable to the client
//! - No trust in client input

pub mod rate_limit;
pub mod signature;
pub mod token;

pub use rate_limit::{Admission, ClientRegistry};
pub use signature::CONTENT_SIGN;
pub use token::{SessionToken, TokenError};
