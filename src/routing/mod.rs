//! Route metadata and registration.
//!
//! # Design Decisions
//! - Exactly one handler shape per route, enforced by a closed enum bound
//!   at registration time; dispatch pattern-matches the variant instead of
//!   probing optional fields
//! - Handlers return an explicit payload sum type so raw-output routes are
//!   checked against a variant, not a downcast
//! - Registration is static at startup; the registry is read-only afterwards

pub mod registry;

use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::HandlerError;

pub use registry::{RegistryError, RouteRegistry};

/// What a handler hands back to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerPayload {
    /// No body. Raw routes answer with an empty 200; enveloped routes
    /// carry a null data field.
    Empty,
    /// Verbatim bytes. The only payload a raw-output route may produce.
    Bytes(Vec<u8>),
    /// Structured data embedded in the response envelope.
    Structured(serde_json::Value),
}

pub type HandlerResult = Result<HandlerPayload, HandlerError>;
type BoxHandlerFuture = BoxFuture<'static, HandlerResult>;

type DefaultFn = dyn Fn(String, Bytes) -> BoxHandlerFuture + Send + Sync;
type IpAwareFn = dyn Fn(IpAddr, String, Bytes) -> BoxHandlerFuture + Send + Sync;
type SessionAwareFn = dyn Fn(String, Bytes) -> BoxHandlerFuture + Send + Sync;
type UserAgentAwareFn = dyn Fn(String, String, Bytes) -> BoxHandlerFuture + Send + Sync;

/// The closed set of handler shapes a route may bind.
#[derive(Clone)]
pub enum Handler {
    /// `(identity_id, body)`
    Default(Arc<DefaultFn>),
    /// `(client_addr, identity_id, body)`
    IpAware(Arc<IpAwareFn>),
    /// `(session_id, body)` — does not receive the identity id.
    SessionAware(Arc<SessionAwareFn>),
    /// `(user_agent, identity_id, body)`
    UserAgentAware(Arc<UserAgentAwareFn>),
}

impl Handler {
    pub fn default_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(String, Bytes) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::Default(Arc::new(move |identity, body| f(identity, body).boxed()))
    }

    pub fn ip_aware<F, Fut>(f: F) -> Self
    where
        F: Fn(IpAddr, String, Bytes) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::IpAware(Arc::new(move |addr, identity, body| {
            f(addr, identity, body).boxed()
        }))
    }

    pub fn session_aware<F, Fut>(f: F) -> Self
    where
        F: Fn(String, Bytes) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::SessionAware(Arc::new(move |session, body| f(session, body).boxed()))
    }

    pub fn user_agent_aware<F, Fut>(f: F) -> Self
    where
        F: Fn(String, String, Bytes) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::UserAgentAware(Arc::new(move |agent, identity, body| {
            f(agent, identity, body).boxed()
        }))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match self {
            Handler::Default(_) => "Default",
            Handler::IpAware(_) => "IpAware",
            Handler::SessionAware(_) => "SessionAware",
            Handler::UserAgentAware(_) => "UserAgentAware",
        };
        f.debug_tuple("Handler").field(&shape).finish()
    }
}

/// Capability flags a route declares at registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteFlags {
    /// Signature verification against a decoded session token.
    pub auth: bool,
    /// Successful responses are cached and probed before dispatch.
    pub cache: bool,
    /// Handler output is written verbatim, bypassing the envelope.
    pub raw: bool,
    /// The gateway-wide User-Agent requirement applies to this route.
    pub user_agent_check: bool,
}

/// One registered route. Immutable after registration.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: String,
    pub flags: RouteFlags,
    /// Minimum accepted client version.
    pub min_version: i64,
    /// Content type emitted for raw-output responses.
    pub content_type: Option<String>,
    pub handler: Handler,
}

impl Route {
    pub fn new(pattern: impl Into<String>, handler: Handler) -> Self {
        Self {
            pattern: pattern.into(),
            flags: RouteFlags::default(),
            min_version: 0,
            content_type: None,
            handler,
        }
    }

    pub fn with_auth(mut self) -> Self {
        self.flags.auth = true;
        self
    }

    pub fn with_cache(mut self) -> Self {
        self.flags.cache = true;
        self
    }

    pub fn raw_output(mut self) -> Self {
        self.flags.raw = true;
        self
    }

    pub fn with_user_agent_check(mut self) -> Self {
        self.flags.user_agent_check = true;
        self
    }

    pub fn min_version(mut self, version: i64) -> Self {
        self.min_version = version;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let route = Route::new("/echo", Handler::default_fn(|_, _| async { Ok(HandlerPayload::Empty) }))
            .with_auth()
            .with_cache()
            .min_version(3)
            .content_type("application/json");

        assert!(route.flags.auth);
        assert!(route.flags.cache);
        assert!(!route.flags.raw);
        assert_eq!(route.min_version, 3);
        assert_eq!(route.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn handler_shapes_receive_their_arguments() {
        let handler = Handler::user_agent_aware(|agent, identity, _body| async move {
            Ok(HandlerPayload::Structured(serde_json::json!({
                "agent": agent,
                "identity": identity,
            })))
        });

        let Handler::UserAgentAware(f) = &handler else {
            panic!("wrong shape");
        };
        let result = f("app-1.0".into(), "42".into(), Bytes::new()).await.unwrap();
        assert_eq!(
            result,
            HandlerPayload::Structured(serde_json::json!({"agent": "app-1.0", "identity": "42"}))
        );
    }
}
