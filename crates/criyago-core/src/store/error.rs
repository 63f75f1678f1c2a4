use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - API key or session token rejected")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflicting record: {0}")]
    Conflict(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Record encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Local store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl StoreError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => StoreError::Unauthorized,
            403 => StoreError::AccessDenied(truncated),
            404 => StoreError::NotFound(truncated),
            409 => StoreError::Conflict(truncated),
            429 => StoreError::RateLimited,
            500..=599 => StoreError::ServerError(truncated),
            _ => StoreError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_maps_known_codes() {
        assert!(matches!(
            StoreError::from_status(StatusCode::UNAUTHORIZED, ""),
            StoreError::Unauthorized
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::CONFLICT, "duplicate key"),
            StoreError::Conflict(ref b) if b == "duplicate key"
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            StoreError::ServerError(_)
        ));
        assert!(matches!(
            StoreError::from_status(StatusCode::BAD_REQUEST, "bad filter"),
            StoreError::InvalidResponse(ref m) if m.contains("400")
        ));
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        match StoreError::from_status(StatusCode::FORBIDDEN, &body) {
            StoreError::AccessDenied(msg) => {
                assert!(msg.contains("truncated"));
                assert!(msg.contains(&format!("{} total bytes", body.len())));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
