//! Access/refresh token pair and JWT payload decoding
//!
//! The client never verifies token signatures; that is the server's job. It
//! only reads the payload of the access token to find out who is logged in.

use crate::error::{CoreError, CoreResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials returned by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Copy of this pair with the access token replaced
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: self.refresh.clone(),
        }
    }

    /// Decode the claims carried by the access token
    pub fn claims(&self) -> CoreResult<AccessClaims> {
        AccessClaims::decode(&self.access)
    }
}

/// The parts of the access token payload the client cares about
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessClaims {
    #[serde(deserialize_with = "deserialize_user_id")]
    pub user_id: u64,
    /// Expiration time (as UTC timestamp)
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    /// Decode the payload segment of a JWT without verifying it
    pub fn decode(token: &str) -> CoreResult<Self> {
        let mut segments = token.split('.');
        let payload = match (segments.next(), segments.next(), segments.next()) {
            (Some(_), Some(payload), Some(_)) => payload,
            _ => return Err(CoreError::invalid_token("expected three dot-separated segments")),
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| CoreError::invalid_token(format!("payload is not base64url: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::invalid_token(format!("payload is not valid claims: {e}")))
    }

    /// When the access token stops being accepted, if the payload says
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

// The backend emits the primary key as a number, but string ids are accepted too.
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UserIdClaim {
        Number(u64),
        Text(String),
    }

    match UserIdClaim::deserialize(deserializer)? {
        UserIdClaim::Number(id) => Ok(id),
        UserIdClaim::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    /// Build an unsigned token whose payload is the given JSON
    pub fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::token_with_payload;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_numeric_user_id() {
        let token = token_with_payload(&json!({
            "token_type": "access",
            "exp": 1_900_000_000,
            "user_id": 42
        }));

        let claims = AccessClaims::decode(&token).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.exp, Some(1_900_000_000));
    }

    #[test]
    fn test_decode_string_user_id() {
        let token = token_with_payload(&json!({ "user_id": "7" }));
        assert_eq!(AccessClaims::decode(&token).unwrap().user_id, 7);
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(AccessClaims::decode("not-a-jwt").is_err());
        assert!(AccessClaims::decode("a.%%%.c").is_err());

        let no_user = token_with_payload(&json!({ "exp": 1 }));
        assert!(matches!(
            AccessClaims::decode(&no_user),
            Err(CoreError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_expiry() {
        let token = token_with_payload(&json!({ "user_id": 1, "exp": 1_000 }));
        let claims = AccessClaims::decode(&token).unwrap();
        assert_eq!(claims.expires_at(), DateTime::from_timestamp(1_000, 0));

        let no_exp = token_with_payload(&json!({ "user_id": 1 }));
        assert_eq!(AccessClaims::decode(&no_exp).unwrap().expires_at(), None);
    }

    #[test]
    fn test_with_access_keeps_refresh() {
        let pair = TokenPair::new("old", "R");
        assert_eq!(pair.with_access("new"), TokenPair::new("new", "R"));
    }
}
