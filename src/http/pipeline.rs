//! The per-request pipeline.
//!
//! Strictly sequential gates, short-circuiting to a terminal rejection:
//!
//! ```text
//! admission → cors/preflight → user-agent gate → signature presence
//!     → body acquisition → envelope decode → version gate → authentication
//!     → cache probe → dispatch → response formatting
//! ```
//!
//! Every failure is terminal for its request; there are no retries. Cache
//! failures are the one exception to fail-closed: they are logged and the
//! request falls through to normal dispatch.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CACHE_CONTROL, CONTENT_TYPE,
    EXPIRES, ORIGIN, PRAGMA, USER_AGENT, VARY,
};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;

use crate::config::{CorsConfig, IdentityConfig};
use crate::error::{AuthFailure, GatewayError};
use crate::http::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::http::server::GatewayState;
use crate::observability::metrics;
use crate::routing::{Handler, HandlerPayload, Route};
use crate::security::rate_limit::Admission;
use crate::security::{signature, SessionToken};

static CONTENT_SIGN: HeaderName = HeaderName::from_static(signature::CONTENT_SIGN);

/// Handle one inbound request against its registered route.
pub async fn handle(
    state: GatewayState,
    route: std::sync::Arc<Route>,
    addr: SocketAddr,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();

    // Admission before any real work.
    if state.config.rate_limit.enabled {
        match state.clients.admit(addr.ip()) {
            Admission::Allowed => {}
            decision @ (Admission::HighFrequency | Admission::Throttled) => {
                tracing::warn!(
                    client = %addr.ip(),
                    pattern = %route.pattern,
                    decision = ?decision,
                    "admission rejected"
                );
                let response = rejection(&route, GatewayError::AdmissionRejected);
                metrics::record_request(&route.pattern, response.status().as_u16(), start);
                return response;
            }
        }
    }

    // Transport policy: CORS headers apply to every response in
    // cross-origin mode; preflights are answered immediately.
    let cors = state
        .config
        .cors
        .enabled
        .then(|| cors_headers(&state.config.cors, request.headers()));

    let mut response = if cors.is_some() && request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        match process(&state, &route, addr, request).await {
            Ok(response) => response,
            Err(err) => rejection(&route, err),
        }
    };

    if let Some(headers) = cors {
        response.headers_mut().extend(headers);
    }
    metrics::record_request(&route.pattern, response.status().as_u16(), start);
    response
}

/// Gates 3 through 11. Returns the terminal response or the rejection that
/// ended the request.
async fn process(
    state: &GatewayState,
    route: &Route,
    addr: SocketAddr,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // Client identity gate.
    let identity_config = &state.config.identity;
    if route.flags.user_agent_check
        && !identity_config.required_user_agent.is_empty()
        && !user_agent_allowed(identity_config, &user_agent)
    {
        tracing::warn!(pattern = %route.pattern, user_agent = %user_agent, "user agent rejected");
        return Err(GatewayError::IdentityRejected);
    }

    // Signature presence gate. Format is checked later, after the token
    // decodes.
    let supplied_signature = request
        .headers()
        .get(&CONTENT_SIGN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if route.flags.auth && supplied_signature.is_none() {
        return Err(GatewayError::MissingSignature);
    }

    // Body acquisition.
    let body = acquire_body(state, request).await?;
    if body.is_empty() {
        return Err(GatewayError::EmptyBody);
    }

    // Envelope decode. Not recoverable locally.
    let envelope = RequestEnvelope::decode(&body).map_err(GatewayError::DecodeFailed)?;

    // Version gate.
    if envelope.version < route.min_version {
        return Err(GatewayError::VersionTooLow {
            client: envelope.version,
            required: route.min_version,
        });
    }

    // Authentication.
    let mut identity_id = 0i64;
    let mut session_id = 0i64;
    let mut access_key: Option<Vec<u8>> = None;
    if route.flags.auth {
        if envelope.token.is_empty() {
            return Err(GatewayError::AuthRejected(AuthFailure::EmptyToken));
        }
        let token = SessionToken::decode(&envelope.token).map_err(|err| {
            tracing::warn!(pattern = %route.pattern, error = %err, "token rejected");
            GatewayError::AuthRejected(AuthFailure::InvalidToken)
        })?;
        let supplied = supplied_signature.as_deref().unwrap_or_default();
        if !signature::verify(supplied, &body, token.access_key()) {
            tracing::warn!(pattern = %route.pattern, "request signature mismatch");
            return Err(GatewayError::AuthRejected(AuthFailure::BadSignature));
        }
        identity_id = token.id();
        session_id = token.session();
        access_key = Some(token.access_key().to_vec());
    }

    // Cache probe. A hit short-circuits dispatch entirely.
    if route.flags.cache {
        if let Some(cached) =
            state
                .cache
                .lookup(&route.pattern, &body, &envelope.token, &envelope.device_id)
        {
            return Ok(write_cached(route, cached, access_key.as_deref()));
        }
    }

    // Dispatch on the one bound handler shape.
    let result = match &route.handler {
        Handler::Default(f) => f(identity_id.to_string(), body.clone()).await,
        Handler::IpAware(f) => f(addr.ip(), identity_id.to_string(), body.clone()).await,
        Handler::SessionAware(f) => f(session_id.to_string(), body.clone()).await,
        Handler::UserAgentAware(f) => {
            f(user_agent.clone(), identity_id.to_string(), body.clone()).await
        }
    };

    if route.flags.raw {
        format_raw(state, route, &envelope, &body, result)
    } else {
        format_enveloped(state, route, &envelope, &body, result, access_key.as_deref())
    }
}

/// Synthesize the body from query parameters for read-only requests
/// (flattened to one value per key, first occurrence wins); read the body
/// up to the configured cap for everything else.
async fn acquire_body(state: &GatewayState, request: Request<Body>) -> Result<Bytes, GatewayError> {
    if request.method() == Method::GET {
        let mut params: BTreeMap<String, String> = BTreeMap::new();
        if let Some(query) = request.uri().query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        let bytes = serde_json::to_vec(&params).map_err(GatewayError::DecodeFailed)?;
        Ok(Bytes::from(bytes))
    } else {
        axum::body::to_bytes(request.into_body(), state.config.limits.max_payload_bytes)
            .await
            .map_err(|_| GatewayError::PayloadTooLarge)
    }
}

fn user_agent_allowed(config: &IdentityConfig, agent: &str) -> bool {
    if agent == config.dev_user_agent {
        return true;
    }
    match config.required_user_agent.strip_suffix("-*") {
        Some(prefix) => agent.starts_with(prefix),
        None => agent == config.required_user_agent,
    }
}

/// Terminal success from the cache. Raw routes get the bytes verbatim;
/// enveloped routes get a fresh signature over the cached bytes when auth
/// is on.
fn write_cached(route: &Route, cached: Vec<u8>, access_key: Option<&[u8]>) -> Response {
    if route.flags.raw {
        return (StatusCode::OK, cached).into_response();
    }
    let signature_header = access_key
        .filter(|_| route.flags.auth)
        .map(|key| signature::sign(&cached, key));
    let mut response = (StatusCode::OK, cached).into_response();
    if let Some(sig) = signature_header {
        response.headers_mut().insert(&CONTENT_SIGN, header_value(&sig));
    }
    response
}

/// Response formatting for raw-output routes. Handler errors surface as
/// transport-level failures here, unlike enveloped routes.
fn format_raw(
    state: &GatewayState,
    route: &Route,
    envelope: &RequestEnvelope,
    params: &[u8],
    result: Result<HandlerPayload, crate::error::HandlerError>,
) -> Result<Response, GatewayError> {
    match result {
        Err(err) => {
            tracing::error!(pattern = %route.pattern, error = %err, "raw handler failed");
            Err(GatewayError::HandlerFailed(err))
        }
        Ok(HandlerPayload::Empty) => Ok(StatusCode::OK.into_response()),
        Ok(HandlerPayload::Bytes(bytes)) => {
            if route.flags.cache {
                state
                    .cache
                    .store(&route.pattern, params, &envelope.token, &envelope.device_id, &bytes);
            }
            let mut response = (StatusCode::OK, bytes).into_response();
            if let Some(content_type) = &route.content_type {
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, header_value(content_type));
            }
            Ok(response)
        }
        Ok(HandlerPayload::Structured(_)) => {
            tracing::error!(pattern = %route.pattern, "raw route produced a structured payload");
            Err(GatewayError::FormatError)
        }
    }
}

/// Response formatting for enveloped routes. Handler errors become the
/// envelope state string under an HTTP 200; only successes are cached.
fn format_enveloped(
    state: &GatewayState,
    route: &Route,
    envelope: &RequestEnvelope,
    params: &[u8],
    result: Result<HandlerPayload, crate::error::HandlerError>,
    access_key: Option<&[u8]>,
) -> Result<Response, GatewayError> {
    let (wire, succeeded) = match result {
        Ok(payload) => (
            ResponseEnvelope::ok(route.min_version, payload_to_value(payload)),
            true,
        ),
        Err(err) => {
            tracing::warn!(pattern = %route.pattern, error = %err, "handler returned error state");
            (ResponseEnvelope::error(route.min_version, err.to_string()), false)
        }
    };

    let bytes = wire.to_bytes().map_err(|err| {
        tracing::error!(pattern = %route.pattern, error = %err, "envelope serialization failed");
        GatewayError::FormatError
    })?;

    if succeeded && route.flags.cache {
        state
            .cache
            .store(&route.pattern, params, &envelope.token, &envelope.device_id, &bytes);
    }

    let signature_header = access_key
        .filter(|_| route.flags.auth)
        .map(|key| signature::sign(&bytes, key));
    let mut response = (StatusCode::OK, bytes).into_response();
    if let Some(sig) = signature_header {
        response.headers_mut().insert(&CONTENT_SIGN, header_value(&sig));
    }
    Ok(response)
}

fn payload_to_value(payload: HandlerPayload) -> Option<Value> {
    match payload {
        HandlerPayload::Empty => None,
        HandlerPayload::Structured(value) => Some(value),
        // Byte payloads on enveloped routes travel as base64 strings.
        HandlerPayload::Bytes(bytes) => Some(Value::String(BASE64.encode(bytes))),
    }
}

fn rejection(route: &Route, err: GatewayError) -> Response {
    let reason = match &err {
        GatewayError::AuthRejected(failure) => failure.as_str(),
        _ => "",
    };
    tracing::warn!(
        pattern = %route.pattern,
        kind = err.kind(),
        reason,
        status = err.status().as_u16(),
        "request rejected"
    );
    metrics::record_rejected(err.kind());
    err.into_response()
}

/// CORS headers attached to every response when cross-origin mode is on.
fn cors_headers(config: &CorsConfig, request_headers: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(origin) = request_headers.get(ORIGIN).and_then(|v| v.to_str().ok()) {
        if config.allowed_origins.iter().any(|allowed| allowed == origin) {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(VARY, HeaderValue::from_static("Origin"));
                headers.insert(
                    ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static("Content-Sign"),
                );
            }
        }
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Requested-With, Content-Sign"),
    );
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

fn header_value(value: &str) -> HeaderValue {
    // Signatures are hex and content types come from registration; both
    // are valid header values.
    HeaderValue::from_str(value).unwrap_or(HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    #[test]
    fn user_agent_exact_match() {
        let mut config = GatewayConfig::default().identity;
        config.required_user_agent = "app-ios".to_string();

        assert!(user_agent_allowed(&config, "app-ios"));
        assert!(!user_agent_allowed(&config, "app-android"));
        assert!(!user_agent_allowed(&config, ""));
    }

    #[test]
    fn user_agent_wildcard_prefix_match() {
        let mut config = GatewayConfig::default().identity;
        config.required_user_agent = "app-*".to_string();

        assert!(user_agent_allowed(&config, "app-1.0"));
        assert!(user_agent_allowed(&config, "app-"));
        assert!(!user_agent_allowed(&config, "web-1.0"));
    }

    #[test]
    fn dev_override_always_passes() {
        let mut config = GatewayConfig::default().identity;
        config.required_user_agent = "app-ios".to_string();

        assert!(user_agent_allowed(&config, "dev tool"));
    }

    #[test]
    fn enveloped_bytes_payload_travels_as_base64() {
        let value = payload_to_value(HandlerPayload::Bytes(vec![1, 2, 3]));
        assert_eq!(value, Some(Value::String(BASE64.encode([1, 2, 3]))));
        assert_eq!(payload_to_value(HandlerPayload::Empty), None);
    }

    #[test]
    fn cors_echoes_only_allowed_origins() {
        let config = CorsConfig {
            enabled: true,
            allowed_origins: vec!["https://app.example".to_string()],
        };

        let mut request_headers = HeaderMap::new();
        request_headers.insert(ORIGIN, HeaderValue::from_static("https://app.example"));
        let headers = cors_headers(&config, &request_headers);
        assert_eq!(
            headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );
        assert_eq!(headers.get(ACCESS_CONTROL_EXPOSE_HEADERS).unwrap(), "Content-Sign");

        let mut request_headers = HeaderMap::new();
        request_headers.insert(ORIGIN, HeaderValue::from_static("https://evil.example"));
        let headers = cors_headers(&config, &request_headers);
        assert!(headers.get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        // Method/header lists are attached regardless of origin.
        assert!(headers.get(ACCESS_CONTROL_ALLOW_METHODS).is_some());
    }
}
