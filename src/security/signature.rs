//! Request and response body signing.
//!
//! Signatures are HMAC-SHA256 over the raw body bytes, keyed by the access
//! key recovered from the session token, hex-encoded in the `Content-Sign`
//! header. Verification uses a constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the body signature.
pub const CONTENT_SIGN: &str = "content-sign";

/// Sign `payload` with `access_key`. Returns the hex-encoded MAC.
pub fn sign(payload: &[u8], access_key: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(access_key)
        .expect("HMAC accepts keys of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Check that `signature` is the MAC of `payload` under `access_key`.
pub fn verify(signature: &str, payload: &[u8], access_key: &[u8]) -> bool {
    let expected = sign(payload, access_key);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"an-access-key-recovered-from-token";

    #[test]
    fn sign_is_deterministic_hex() {
        let a = sign(b"payload", KEY);
        let b = sign(b"payload", KEY);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn verify_accepts_matching_signature() {
        let sig = sign(b"payload", KEY);
        assert!(verify(&sig, b"payload", KEY));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let sig = sign(b"payload", KEY);
        assert!(!verify(&sig, b"payload!", KEY));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let sig = sign(b"payload", KEY);
        assert!(!verify(&sig, b"payload", b"some-other-key"));
    }

    #[test]
    fn verify_rejects_garbage_signature() {
        assert!(!verify("not-a-mac", b"payload", KEY));
        assert!(!verify("", b"payload", KEY));
    }
}
