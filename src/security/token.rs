//! Session token decoding.
//!
//! The gateway does not mint tokens; it only decodes the opaque string a
//! client presents and reads the fields it needs: identity id, session id,
//! and the access key used as the signing secret. Expiry is enforced here
//! as part of decoding.
//!
//! Transport encoding: standard base64 over a compact JSON claims object
//! `{"i": id, "s": session, "k": access_key, "e": expires_at}`.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    #[serde(rename = "i")]
    id: i64,
    #[serde(rename = "s")]
    session: i64,
    #[serde(rename = "k")]
    access_key: String,
    #[serde(rename = "e")]
    expires_at: u64,
}

/// Error type for token decoding.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,
}

/// A decoded session token. Never persisted by the gateway.
#[derive(Debug, Clone)]
pub struct SessionToken {
    id: i64,
    session: i64,
    access_key: Vec<u8>,
}

impl SessionToken {
    /// Decode and validate a client-supplied token string.
    pub fn decode(raw: &str) -> Result<Self, TokenError> {
        let bytes = BASE64.decode(raw.trim()).map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

        if claims.expires_at <= unix_now() {
            return Err(TokenError::Expired);
        }

        Ok(Self {
            id: claims.id,
            session: claims.session,
            access_key: claims.access_key.into_bytes(),
        })
    }

    /// Encode a token string. Used by the issuing side and by tests; the
    /// issuance protocol itself lives outside the gateway.
    pub fn encode(id: i64, session: i64, access_key: &str, expires_at: u64) -> String {
        let claims = TokenClaims {
            id,
            session,
            access_key: access_key.to_string(),
            expires_at,
        };
        let json = serde_json::to_vec(&claims).expect("claims serialize to JSON");
        BASE64.encode(json)
    }

    /// Identity id carried by the token.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Session id carried by the token.
    pub fn session(&self) -> i64 {
        self.session
    }

    /// Key material used to sign request and response bodies.
    pub fn access_key(&self) -> &[u8] {
        &self.access_key
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
