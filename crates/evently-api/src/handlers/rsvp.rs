//! RSVP HTTP handlers.
//!
//! All routes live under `/api/events/:id`. Submitting, reading and
//! withdrawing act on the caller's own RSVP; the attendee list is restricted
//! to the event's organizer.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use evently_core::{EventId, Rsvp, RsvpCount, RsvpWithUser};

use crate::{ApiError, AppState, RequireAuth};

#[derive(Debug, Deserialize)]
pub struct SubmitRsvpRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub(crate) fn parse_event_id(raw: &str) -> Result<EventId, ApiError> {
    raw.trim()
        .parse::<EventId>()
        .map_err(|_| ApiError::BadRequest("Invalid event ID".to_string()))
}

/// Create or update the caller's RSVP.
///
/// Returns:
/// - 200 once the status is stored
/// - 400 for a malformed event ID, body, or status
/// - 401 without a valid bearer token
/// - 404 when the event or user does not exist
pub async fn submit_rsvp(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(event_id): Path<String>,
    body: Result<Json<SubmitRsvpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    let Json(req) = body.map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;

    state.rsvps.submit(event_id, auth.user_id, &req.status).await?;

    Ok(Json(MessageResponse {
        message: "RSVP updated successfully",
    }))
}

/// The caller's RSVP for the event, or `null`.
pub async fn get_rsvp(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(event_id): Path<String>,
) -> Result<Json<Option<Rsvp>>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    Ok(Json(state.rsvps.get_rsvp(event_id, auth.user_id).await?))
}

/// Withdraw the caller's RSVP. Succeeds when there was none.
pub async fn delete_rsvp(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(event_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    state.rsvps.withdraw(event_id, auth.user_id).await?;
    Ok(Json(MessageResponse {
        message: "RSVP deleted successfully",
    }))
}

/// Public per-status counts.
pub async fn rsvp_count(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<RsvpCount>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    Ok(Json(state.rsvps.get_count(event_id).await?))
}

/// Attendee list for the organizer.
///
/// Returns:
/// - 200 with RSVPs, most recent first
/// - 403 when the caller does not own the event
/// - 404 when the event does not exist
pub async fn list_rsvps(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<RsvpWithUser>>, ApiError> {
    let event_id = parse_event_id(&event_id)?;
    Ok(Json(state.rsvps.list(event_id, auth.user_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_id() {
        assert_eq!(parse_event_id("42").unwrap(), 42);
        assert_eq!(parse_event_id(" 7 ").unwrap(), 7);
        assert!(parse_event_id("abc").is_err());
        assert!(parse_event_id("").is_err());
        assert!(parse_event_id("99999999999").is_err());
    }
}
