// common/src/models/token.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of checking a bearer token.
///
/// Remote and local checks report through the same type so callers can tell
/// a revoked token from an expired one or from one that is not a JWT at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Accepted by the backend, or structurally sound and unexpired
    Valid,
    /// JWT-shaped but `exp` is in the past
    Expired,
    /// Not a JWT: wrong segment count, undecodable payload, no `exp`
    Malformed,
    /// The backend answered and refused the token
    Rejected,
}

impl TokenStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, TokenStatus::Valid)
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TokenStatus::Valid => "valid",
            TokenStatus::Expired => "expired",
            TokenStatus::Malformed => "malformed",
            TokenStatus::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Claims the gate cares about. Everything else in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub exp: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_valid_is_valid() {
        assert!(TokenStatus::Valid.is_valid());
        for status in [
            TokenStatus::Expired,
            TokenStatus::Malformed,
            TokenStatus::Rejected,
        ] {
            assert!(!status.is_valid(), "{} should not be valid", status);
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TokenStatus::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }
}
