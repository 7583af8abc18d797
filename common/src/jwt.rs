// common/src/jwt.rs
//! Structural JWT inspection.
//!
//! This is the fallback used when the backend cannot be asked. It checks shape
//! and expiry only; signatures are never verified here, so a revoked token
//! still passes until it expires.

use crate::models::token::{TokenClaims, TokenStatus};

/// Inspect `token` against the unix time `now` (seconds).
pub fn inspect_token(token: &str, now: i64) -> TokenStatus {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return TokenStatus::Malformed;
    }

    let payload = match decode_segment(segments[1]) {
        Some(bytes) => bytes,
        None => return TokenStatus::Malformed,
    };

    let claims: TokenClaims = match serde_json::from_slice(&payload) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Token payload is not a JSON object: {}", e);
            return TokenStatus::Malformed;
        }
    };

    match claims.exp.as_ref().and_then(|v| v.as_f64()) {
        Some(exp) if exp > now as f64 => TokenStatus::Valid,
        Some(_) => TokenStatus::Expired,
        None => TokenStatus::Malformed,
    }
}

// Accepts both padded and unpadded base64url
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    base64::decode_config(segment.trim_end_matches('='), base64::URL_SAFE_NO_PAD).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const NOW: i64 = 1_700_000_000;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    fn mint(exp: i64) -> String {
        let claims = Claims { sub: "admin@zenow.test".to_string(), exp };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"irrelevant")).unwrap()
    }

    fn with_payload(payload: &str) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
            base64::encode_config(payload, base64::URL_SAFE_NO_PAD)
        )
    }

    #[test]
    fn test_unexpired_jwt_is_valid() {
        assert_eq!(inspect_token(&mint(NOW + 3600), NOW), TokenStatus::Valid);
    }

    #[test]
    fn test_past_exp_is_expired() {
        assert_eq!(inspect_token(&mint(NOW - 1), NOW), TokenStatus::Expired);
        assert_eq!(inspect_token(&mint(NOW), NOW), TokenStatus::Expired);
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        assert_eq!(inspect_token("abc", NOW), TokenStatus::Malformed);
        assert_eq!(inspect_token("a.b", NOW), TokenStatus::Malformed);
        assert_eq!(inspect_token("a.b.c.d", NOW), TokenStatus::Malformed);
        assert_eq!(inspect_token("a..c", NOW), TokenStatus::Malformed);
    }

    #[test]
    fn test_undecodable_payload_is_malformed() {
        assert_eq!(inspect_token("header.!!!.sig", NOW), TokenStatus::Malformed);
        assert_eq!(inspect_token(&with_payload("not json"), NOW), TokenStatus::Malformed);
        assert_eq!(inspect_token(&with_payload("[1,2,3]"), NOW), TokenStatus::Malformed);
    }

    #[test]
    fn test_missing_or_textual_exp_is_malformed() {
        assert_eq!(inspect_token(&with_payload(r#"{"sub":"x"}"#), NOW), TokenStatus::Malformed);
        assert_eq!(
            inspect_token(&with_payload(r#"{"exp":"tomorrow"}"#), NOW),
            TokenStatus::Malformed
        );
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let payload = format!(r#"{{"exp":{}}}"#, NOW + 60);
        let token = format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
            base64::encode_config(payload, base64::URL_SAFE)
        );
        assert_eq!(inspect_token(&token, NOW), TokenStatus::Valid);
    }
}
