//! Client error types

use shared::error::ApiResponse;
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Role or branch session cannot perform the operation
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Entity or location not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Name already used in an overlapping scope
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid scope or missing field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Map a failed response to an error variant
    ///
    /// The message is taken from the `ApiResponse` body when it parses,
    /// otherwise the raw body is kept.
    pub fn from_status(status: http::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
            .map(|r| match r.code {
                Some(code) => format!("[{code}] {}", r.message),
                None => r.message,
            })
            .unwrap_or_else(|_| body.to_string());

        match status {
            http::StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            http::StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            http::StatusCode::NOT_FOUND => ClientError::NotFound(message),
            http::StatusCode::CONFLICT => ClientError::Conflict(message),
            http::StatusCode::BAD_REQUEST => ClientError::Validation(message),
            _ => ClientError::Internal(message),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_keeps_server_message() {
        let body = r#"{"code":6103,"message":"category \"Drinks\" already exists in this scope"}"#;
        match ClientError::from_status(http::StatusCode::CONFLICT, body) {
            ClientError::Conflict(msg) => {
                assert!(msg.starts_with("[6103]"));
                assert!(msg.contains("Drinks"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unparsable_body_is_kept() {
        match ClientError::from_status(http::StatusCode::BAD_GATEWAY, "upstream down") {
            ClientError::Internal(msg) => assert_eq!(msg, "upstream down"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
