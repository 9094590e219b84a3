//! Gateway error taxonomy.
//!
//! Every pipeline gate maps to exactly one variant here, and every variant
//! maps to exactly one rejection status code. Authentication failures keep
//! distinct internal kinds for logging but share a single client-visible
//! reason so callers cannot distinguish token-decode from signature failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Internal reason for an authentication rejection. Logged, never sent to
/// the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The request envelope carried no token.
    EmptyToken,
    /// The token string did not decode to a valid session token.
    InvalidToken,
    /// The supplied signature did not match the request body.
    BadSignature,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::EmptyToken => "empty_token",
            AuthFailure::InvalidToken => "invalid_token",
            AuthFailure::BadSignature => "bad_signature",
        }
    }
}

/// Terminal rejection outcomes of the request pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("too many requests")]
    AdmissionRejected,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("no content")]
    EmptyBody,

    #[error("forbidden")]
    IdentityRejected,

    #[error("forbidden")]
    MissingSignature,

    #[error("not acceptable")]
    AuthRejected(AuthFailure),

    #[error("client version {client} is below required version {required}")]
    VersionTooLow { client: i64, required: i64 },

    #[error("internal error")]
    DecodeFailed(#[source] serde_json::Error),

    /// A raw-output route's handler failed. Enveloped routes never produce
    /// this; their handler errors travel in the response envelope instead.
    #[error("internal error")]
    HandlerFailed(#[source] HandlerError),

    #[error("internal error")]
    FormatError,
}

impl GatewayError {
    /// The HTTP status this rejection is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AdmissionRejected => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::EmptyBody => StatusCode::NO_CONTENT,
            GatewayError::IdentityRejected | GatewayError::MissingSignature => {
                StatusCode::FORBIDDEN
            }
            GatewayError::AuthRejected(_) => StatusCode::NOT_ACCEPTABLE,
            GatewayError::VersionTooLow { .. } => StatusCode::GONE,
            GatewayError::DecodeFailed(_)
            | GatewayError::HandlerFailed(_)
            | GatewayError::FormatError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for rejection metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::AdmissionRejected => "admission",
            GatewayError::PayloadTooLarge => "payload_too_large",
            GatewayError::EmptyBody => "empty_body",
            GatewayError::IdentityRejected => "user_agent",
            GatewayError::MissingSignature => "missing_signature",
            GatewayError::AuthRejected(_) => "auth",
            GatewayError::VersionTooLow { .. } => "version",
            GatewayError::DecodeFailed(_) => "decode",
            GatewayError::HandlerFailed(_) => "handler",
            GatewayError::FormatError => "format",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Error surfaced by a dispatched handler. Carried into the response
/// envelope as the state string for enveloped routes; raw routes turn it
/// into a transport-level failure instead.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_rejection_family() {
        assert_eq!(GatewayError::AdmissionRejected.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(GatewayError::MissingSignature.status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::IdentityRejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GatewayError::VersionTooLow { client: 0, required: 1 }.status(),
            StatusCode::GONE
        );
        assert_eq!(
            GatewayError::AuthRejected(AuthFailure::BadSignature).status(),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn auth_rejections_share_one_client_message() {
        let a = GatewayError::AuthRejected(AuthFailure::EmptyToken).to_string();
        let b = GatewayError::AuthRejected(AuthFailure::InvalidToken).to_string();
        let c = GatewayError::AuthRejected(AuthFailure::BadSignature).to_string();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
