//! Google Calendar HTTP handlers.
//!
//! Every route answers 503 when calendar credentials are not configured.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use evently_calendar::CalendarTokenCoordinator;
use evently_core::{CalendarEventInput, EventId};

use crate::{ApiError, AppState, RequireAuth};

fn calendar(state: &AppState) -> Result<&Arc<CalendarTokenCoordinator>, ApiError> {
    state.calendar.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Google Calendar integration is not configured".to_string())
    })
}

/// Start the OAuth flow. Returns `{"auth_url": ...}`.
pub async fn authorize(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let url = calendar(&state)?.begin_authorization(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "auth_url": url })))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// OAuth redirect target. Stores the token and sends the browser back to the
/// frontend with a 302.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let coordinator = calendar(&state)?;
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing authorization code".to_string()))?;

    let user_id = coordinator
        .complete_authorization(&code, query.state.as_deref().unwrap_or_default())
        .await?;

    info!(subsystem = "api", component = "calendar", user_id, "Calendar connected");

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, state.calendar_connected_url.clone())],
    )
        .into_response())
}

/// `event_id` arrives as a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EventIdParam {
    Number(i64),
    Text(String),
}

impl EventIdParam {
    fn parse(&self) -> Result<EventId, ApiError> {
        let invalid = || ApiError::BadRequest("Invalid event ID format".to_string());
        match self {
            EventIdParam::Number(n) => EventId::try_from(*n).map_err(|_| invalid()),
            EventIdParam::Text(s) => s.trim().parse().map_err(|_| invalid()),
        }
    }
}

/// Either a stored event reference or the literal fields of one.
#[derive(Debug, Deserialize)]
pub struct AddEventRequest {
    pub event_id: Option<EventIdParam>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Insert an event into the caller's primary calendar.
///
/// Returns:
/// - 200 with `{"message", "calendar_event"}`
/// - 400 for a malformed body or event ID
/// - 401 with `"status": "authorization_required"` when the calendar is not
///   connected or the token can no longer be refreshed
/// - 404 when the event does not exist
/// - 502 when Google rejects the insert
pub async fn add_event(
    State(state): State<AppState>,
    auth: RequireAuth,
    body: Result<Json<AddEventRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let coordinator = calendar(&state)?;
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;

    let input = match (&req.event_id, req.title, req.start) {
        (Some(event_id), _, _) => {
            let event = state.rsvps.event(event_id.parse()?).await?;
            CalendarEventInput::from_event(&event)
        }
        (None, Some(title), Some(start)) => CalendarEventInput {
            title,
            description: req.description,
            location: req.location,
            start,
            end: req.end,
        },
        _ => return Err(ApiError::BadRequest("Invalid request body".to_string())),
    };

    let remote = coordinator.sync_event(auth.user_id, &input).await?;

    Ok(Json(serde_json::json!({
        "message": "Event added to Google Calendar successfully",
        "calendar_event": remote,
    })))
}

/// `{"connected": bool}`. A stored token counts only while it is valid or
/// refreshable.
pub async fn check_connection(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let connected = calendar(&state)?.is_connected(auth.user_id).await?;
    Ok(Json(serde_json::json!({ "connected": connected })))
}

/// Forget the caller's stored token. `{"disconnected": bool}` reports whether
/// one existed.
pub async fn disconnect(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = calendar(&state)?.disconnect(auth.user_id).await?;
    info!(
        subsystem = "api",
        component = "calendar",
        user_id = auth.user_id,
        removed,
        "Calendar disconnected"
    );
    Ok(Json(serde_json::json!({ "disconnected": removed })))
}
