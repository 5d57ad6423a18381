//! Shared error type across usersvc crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Requested record does not exist.
    NotFound,
    /// Rate limited.
    RateLimited,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::RateLimited => "RATE_LIMITED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, UserError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),
    #[error("user not found")]
    NotFound(i64),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("store: {0}")]
    Store(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl UserError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            UserError::Validation(_) => ClientCode::BadRequest,
            UserError::NotFound(_) => ClientCode::NotFound,
            UserError::RateLimited => ClientCode::RateLimited,
            UserError::Encoding(_)
            | UserError::Store(_)
            | UserError::Config(_)
            | UserError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Message safe to show a client. Internal detail stays in the logs.
    pub fn client_message(&self) -> String {
        match self.client_code() {
            ClientCode::Internal => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
