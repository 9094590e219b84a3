//! Wire envelopes.
//!
//! Requests carry `{"t": token, "d": device_id, "v": version}` alongside
//! handler-specific fields; all three default when absent. Non-raw
//! responses are wrapped in `{"version", "state", "data"}` where `state`
//! is `"OK"` or the handler's error text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State string of a successful response.
pub const STATE_OK: &str = "OK";

/// Fields the gateway reads out of a decoded request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "t", default)]
    pub token: String,

    #[serde(rename = "d", default)]
    pub device_id: String,

    #[serde(rename = "v", default)]
    pub version: i64,
}

impl RequestEnvelope {
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Response body for non-raw routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub version: i64,
    pub state: String,
    pub data: Option<Value>,
}

impl ResponseEnvelope {
    pub fn ok(version: i64, data: Option<Value>) -> Self {
        Self {
            version,
            state: STATE_OK.to_string(),
            data,
        }
    }

    pub fn error(version: i64, state: impl Into<String>) -> Self {
        Self {
            version,
            state: state.into(),
            data: None,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_fields_default_when_absent() {
        let envelope = RequestEnvelope::decode(br#"{"msg":"hi"}"#).unwrap();
        assert_eq!(envelope.token, "");
        assert_eq!(envelope.device_id, "");
        assert_eq!(envelope.version, 0);
    }

    #[test]
    fn request_decodes_short_field_names() {
        let envelope = RequestEnvelope::decode(br#"{"t":"TOK","d":"DEV","v":3}"#).unwrap();
        assert_eq!(envelope.token, "TOK");
        assert_eq!(envelope.device_id, "DEV");
        assert_eq!(envelope.version, 3);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(RequestEnvelope::decode(b"not json").is_err());
    }

    #[test]
    fn ok_envelope_wire_shape() {
        let bytes = ResponseEnvelope::ok(1, Some(json!({"msg": "hi"})))
            .to_bytes()
            .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"version": 1, "state": "OK", "data": {"msg": "hi"}}));
    }

    #[test]
    fn error_envelope_has_null_data() {
        let bytes = ResponseEnvelope::error(2, "boom").to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"version": 2, "state": "boom", "data": null}));
    }
}
