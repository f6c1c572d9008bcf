//! HTTP error mapping.

use axum::{http::StatusCode, response::IntoResponse, Json};
use tracing::error;

/// Error returned by handlers and extractors. Rendered as `{"error": message}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    /// Calendar token missing or no longer refreshable; the client must
    /// restart the OAuth flow.
    AuthorizationRequired(String),
    BadGateway(String),
    ServiceUnavailable(String),
    Internal(evently_core::Error),
}

impl From<evently_core::Error> for ApiError {
    fn from(err: evently_core::Error) -> Self {
        use evently_core::Error;

        if err.requires_reauthorization() {
            return ApiError::AuthorizationRequired(err.to_string());
        }
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::InvalidOAuthState => ApiError::BadRequest("Invalid state parameter".to_string()),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::Forbidden(msg) => ApiError::Forbidden(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Exchange(msg) | Error::RemoteSync(msg) => ApiError::BadGateway(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::AuthorizationRequired(msg) => {
                let body = Json(serde_json::json!({
                    "error": msg,
                    "message": "Google Calendar authorization required",
                    "status": "authorization_required",
                }));
                return (StatusCode::UNAUTHORIZED, body).into_response();
            }
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(err) => {
                error!(
                    subsystem = "api",
                    error = %err,
                    retryable = err.is_retryable(),
                    "Request failed"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evently_core::Error;

    fn status_of(err: Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_core_errors_map_to_status_codes() {
        assert_eq!(status_of(Error::Validation("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::InvalidOAuthState), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::NotConnected(4)), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::Refresh("revoked".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(Error::Exchange("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(Error::RemoteSync("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(Error::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_keeps_plain_message() {
        match ApiError::from(Error::Validation("Invalid event ID".into())) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Invalid event ID"),
            other => panic!("Expected BadRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let err = Error::Database(sqlx::Error::Protocol("relation \"rsvps\" missing".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"error": "Internal server error"}));
    }

    #[test]
    fn test_reauthorization_variant_for_missing_token() {
        assert!(matches!(
            ApiError::from(Error::NotConnected(9)),
            ApiError::AuthorizationRequired(_)
        ));
    }
}
