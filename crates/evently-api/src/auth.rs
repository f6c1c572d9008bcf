//! Bearer token authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use evently_core::{Authenticator, Error, Result, UserId};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
struct Claims {
    // Issued as a JSON number; some issuers encode it as a float.
    user_id: serde_json::Number,
}

/// HS256 JWT verifier for tokens carrying a numeric `user_id` claim.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, bearer: &str) -> Result<UserId> {
        let data = decode::<Claims>(bearer, &self.key, &self.validation)
            .map_err(|e| Error::Unauthorized(format!("Invalid token: {}", e)))?;

        let user_id = &data.claims.user_id;
        user_id
            .as_i64()
            .or_else(|| {
                user_id
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            })
            .and_then(|id| UserId::try_from(id).ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| Error::Unauthorized("Invalid user_id claim".to_string()))
    }
}

/// Extractor that requires a valid bearer token.
///
/// Rejects with 401 before the handler runs, so an unauthenticated request
/// never reaches a store.
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth {
    pub user_id: UserId,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

        match state.authenticator.authenticate(token) {
            Ok(user_id) => Ok(RequireAuth { user_id }),
            Err(e) => {
                debug!(subsystem = "api", component = "auth", error = %e, "Rejected bearer token");
                Err(ApiError::Unauthorized("Unauthorized".to_string()))
            }
        }
    }
}
