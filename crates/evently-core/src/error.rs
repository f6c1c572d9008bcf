//! Error types for evently.

use thiserror::Error;

use crate::models::UserId;

/// Result type alias using evently's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for evently operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input (invalid status, malformed identifiers). Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing event, user or RSVP
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid credential
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not the owner of the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Store read/write failed (wraps sqlx::Error). The whole operation may be retried.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No calendar token stored for the user
    #[error("Calendar not connected for user {0}")]
    NotConnected(UserId),

    /// OAuth callback state does not match an issued nonce
    #[error("Invalid OAuth state parameter")]
    InvalidOAuthState,

    /// Provider rejected the authorization code
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// Provider rejected the refresh token
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// Remote calendar insert failed
    #[error("Calendar sync failed: {0}")]
    RemoteSync(String),

    /// Notification transport failed
    #[error("Notification error: {0}")]
    Notification(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_))
    }

    /// Whether the caller has to restart the calendar authorization flow.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Error::NotConnected(_) | Error::Refresh(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
