//! # evently-api
//!
//! HTTP boundary for evently: bearer authentication, RSVP routes, and the
//! optional Google Calendar routes.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;

pub use auth::{JwtAuthenticator, RequireAuth};
pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use handlers::{calendar, health, rsvp};

/// Build the application router with tracing and CORS layers.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Router::new()
        .route("/health", get(health::health_check))
        // RSVPs
        .route(
            "/api/events/:id/rsvp",
            get(rsvp::get_rsvp)
                .post(rsvp::submit_rsvp)
                .put(rsvp::submit_rsvp)
                .delete(rsvp::delete_rsvp),
        )
        .route("/api/events/:id/rsvp/count", get(rsvp::rsvp_count))
        .route("/api/events/:id/rsvps", get(rsvp::list_rsvps))
        // Google Calendar
        .route("/api/calendar/authorize", get(calendar::authorize))
        .route("/api/calendar/callback", get(calendar::callback))
        .route("/api/calendar/add-event", post(calendar::add_event))
        .route(
            "/api/calendar/check-connection",
            get(calendar::check_connection),
        )
        .route("/api/calendar/disconnect", delete(calendar::disconnect))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .with_state(state)
}
