// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` parameter.
//!
//! The state carries the Discord user ID through Google's consent screen:
//! `base64url("external_id|timestamp_hex|hmac_hex")`. The HMAC covers the
//! first two fields, so a callback cannot be replayed for someone else.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long a consent link stays valid.
pub const STATE_MAX_AGE_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state is not valid base64/utf-8")]
    Encoding,

    #[error("state is malformed")]
    Malformed,

    #[error("state signature mismatch")]
    BadSignature,

    #[error("state has expired")]
    Expired,

    #[error("invalid signing key")]
    Key,
}

/// Sign `external_id` into an opaque state string.
pub fn sign_state(external_id: &str, key: &[u8], now: DateTime<Utc>) -> Result<String, StateError> {
    let payload = format!("{}|{:x}", external_id, now.timestamp_millis());
    let signature = signature_hex(&payload, key)?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify a state string and return the external ID it carries.
pub fn verify_state(state: &str, key: &[u8], now: DateTime<Utc>) -> Result<String, StateError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(state)
        .map_err(|_| StateError::Encoding)?;
    let decoded = String::from_utf8(bytes).map_err(|_| StateError::Encoding)?;

    // Split from the right: the external ID is opaque.
    let mut parts = decoded.rsplitn(3, '|');
    let signature = parts.next().ok_or(StateError::Malformed)?;
    let timestamp_hex = parts.next().ok_or(StateError::Malformed)?;
    let external_id = parts.next().ok_or(StateError::Malformed)?;
    if external_id.is_empty() {
        return Err(StateError::Malformed);
    }

    let payload = format!("{}|{}", external_id, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| StateError::Key)?;
    mac.update(payload.as_bytes());
    let provided = hex::decode(signature).map_err(|_| StateError::BadSignature)?;
    if mac.verify_slice(&provided).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return Err(StateError::BadSignature);
    }

    let issued_ms = i64::from_str_radix(timestamp_hex, 16).map_err(|_| StateError::Malformed)?;
    let issued = DateTime::from_timestamp_millis(issued_ms).ok_or(StateError::Malformed)?;
    if now - issued > Duration::minutes(STATE_MAX_AGE_MINUTES) {
        return Err(StateError::Expired);
    }

    Ok(external_id.to_string())
}

fn signature_hex(payload: &str, key: &[u8]) -> Result<String, StateError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| StateError::Key)?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"state_key_for_tests";

    #[test]
    fn test_verify_returns_external_id() {
        let now = Utc::now();
        let state = sign_state("123456789012345678", KEY, now).unwrap();
        assert_eq!(
            verify_state(&state, KEY, now).unwrap(),
            "123456789012345678"
        );
    }

    #[test]
    fn test_state_is_url_safe() {
        let state = sign_state("user|with|pipes", KEY, Utc::now()).unwrap();
        assert!(!state.contains('+'));
        assert!(!state.contains('/'));
        assert!(!state.contains('='));
        assert_eq!(
            verify_state(&state, KEY, Utc::now()).unwrap(),
            "user|with|pipes"
        );
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let now = Utc::now();
        let state = sign_state("42", KEY, now).unwrap();
        assert_eq!(
            verify_state(&state, b"other_key", now),
            Err(StateError::BadSignature)
        );
    }

    #[test]
    fn test_swapped_identity_is_rejected() {
        let now = Utc::now();
        let state = sign_state("42", KEY, now).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&state).unwrap()).unwrap();
        let forged = URL_SAFE_NO_PAD.encode(decoded.replacen("42", "43", 1));
        assert_eq!(
            verify_state(&forged, KEY, now),
            Err(StateError::BadSignature)
        );
    }

    #[test]
    fn test_expired_state_is_rejected() {
        let issued = Utc::now() - Duration::minutes(STATE_MAX_AGE_MINUTES + 1);
        let state = sign_state("42", KEY, issued).unwrap();
        assert_eq!(
            verify_state(&state, KEY, Utc::now()),
            Err(StateError::Expired)
        );
    }

    #[test]
    fn test_malformed_state() {
        assert_eq!(
            verify_state("not-valid-base64!!!", KEY, Utc::now()),
            Err(StateError::Encoding)
        );
        let two_parts = URL_SAFE_NO_PAD.encode("only|two");
        assert_eq!(
            verify_state(&two_parts, KEY, Utc::now()),
            Err(StateError::Malformed)
        );
    }
}
