//! Client error types

use medport_core::CoreError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Server error {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The session could not be renewed; the user must log in again
    #[error("Session expired: {0}")]
    AuthExpired(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Token storage failed
    #[error("Token storage failed: {0}")]
    Storage(#[from] CoreError),
}

impl ClientError {
    /// Create error from HTTP status code
    pub fn from_status(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Http {
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    /// Create error from a failed response body
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string)
        });
        Self::from_status(status, detail)
    }

    /// HTTP status of the failed response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16())
    }

    /// Whether the caller has to log in again
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired(_))
    }
}

/// Pull a human-readable message out of a REST framework error body
///
/// Bodies look like `{"detail": "..."}`, `{"error": "..."}`,
/// `{"non_field_errors": ["..."]}` or `{"field": ["..."]}`.
fn extract_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Some(body.to_string());
    };

    match &value {
        Value::Object(fields) => {
            for key in ["detail", "error", "message"] {
                if let Some(text) = fields.get(key).and_then(first_text) {
                    return Some(text);
                }
            }
            if let Some(text) = fields.get("non_field_errors").and_then(first_text) {
                return Some(text);
            }
            fields
                .iter()
                .find_map(|(field, messages)| first_text(messages).map(|m| format!("{field}: {m}")))
        }
        other => first_text(other),
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
