//! Error types for courier

/// Main error type for courier operations
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CourierError {
    /// Whether retrying the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Api { status: 500..=599, .. }
        )
    }
}

// From conversions for common error types

impl From<reqwest::Error> for CourierError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for CourierError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("Token error: {}", err))
    }
}

/// Result type alias for courier operations
pub type Result<T> = std::result::Result<T, CourierError>;
