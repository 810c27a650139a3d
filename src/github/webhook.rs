//! Webhook signature verification (X-Hub-Signature-256 header).
//!
//! The signature covers the raw body bytes; any re-serialization of the
//! JSON before verification would invalidate it.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify a `sha256=<hex>` signature header against the raw payload.
///
/// Fails closed: returns false on a missing secret, a header of the wrong
/// length, or a content mismatch. Never errors.
pub fn verify_webhook_signature(secret: Option<&str>, payload: &[u8], signature_header: &str) -> bool {
    let Some(secret) = secret else {
        tracing::warn!("Webhook secret is not configured, rejecting delivery");
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

    let expected = expected.as_bytes();
    let received = signature_header.as_bytes();
    if expected.len() != received.len() {
        return false;
    }

    expected.ct_eq(received).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    // hex(HMAC-SHA256("s", '{"a":1}'))
    const REFERENCE_SIG: &str =
        "sha256=37beaf650f70b40ec9706929c2e9d835cbd63729988f48781e6383a147215f07";

    #[test]
    fn reference_signature_verifies() {
        assert!(verify_webhook_signature(Some("s"), br#"{"a":1}"#, REFERENCE_SIG));
    }

    #[test]
    fn flipped_body_byte_fails() {
        assert!(!verify_webhook_signature(Some("s"), br#"{"a":2}"#, REFERENCE_SIG));
    }

    #[test]
    fn wrong_secret_fails() {
        assert!(!verify_webhook_signature(Some("t"), br#"{"a":1}"#, REFERENCE_SIG));
    }

    #[test]
    fn wrong_length_header_fails_without_panicking() {
        assert!(!verify_webhook_signature(Some("s"), br#"{"a":1}"#, "sha256=deadbeef"));
        assert!(!verify_webhook_signature(Some("s"), br#"{"a":1}"#, ""));
    }

    #[test]
    fn missing_secret_fails_closed() {
        assert!(!verify_webhook_signature(None, br#"{"a":1}"#, REFERENCE_SIG));
    }

    #[test]
    fn reserialized_body_would_not_verify() {
        // Same JSON value, different bytes (whitespace) - must fail
        assert!(!verify_webhook_signature(Some("s"), br#"{"a": 1}"#, REFERENCE_SIG));
    }
}
