use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::AppState;

/// Liveness plus a database probe when a pool is attached.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => "ok",
            Err(_) => "unavailable",
        },
        None => "detached",
    };

    let (status, label) = if database == "unavailable" {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status,
        Json(serde_json::json!({
            "status": label,
            "database": database,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
