//! Router-level tests against in-memory stores.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use evently_api::{router, services::RsvpCoordinator, AppState, JwtAuthenticator};
use evently_calendar::{mock::MockCalendarProvider, CalendarTokenCoordinator};
use evently_core::mock::{MemoryStore, RecordingTransport};
use evently_core::{CalendarToken, EventId, UserId};
use evently_notify::{DispatcherConfig, MessageTemplates, NotificationDispatcher};

const SECRET: &str = "router-test-secret";
const CONNECTED_URL: &str = "http://frontend.test/calendar-connected";

struct TestApp {
    app: Router,
    store: MemoryStore,
    provider: MockCalendarProvider,
    organizer: UserId,
    attendee: UserId,
    event: EventId,
}

fn build(with_calendar: bool) -> TestApp {
    let store = MemoryStore::new();
    let organizer = store.add_user("grace@example.com", "Grace", "Hopper");
    let attendee = store.add_user("alan@example.com", "Alan", "Turing");
    let event = store.add_event(organizer, "Compiler Night", Utc::now() + Duration::days(3));

    let dispatcher = Arc::new(NotificationDispatcher::spawn(
        Arc::new(RecordingTransport::new()),
        MessageTemplates::new("http://frontend.test"),
        DispatcherConfig::default().with_workers(1),
    ));
    let rsvps = Arc::new(RsvpCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        dispatcher,
    ));

    let provider = MockCalendarProvider::new();
    let calendar = with_calendar.then(|| {
        Arc::new(CalendarTokenCoordinator::new(
            Arc::new(provider.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        ))
    });

    let state = AppState {
        db: None,
        rsvps,
        authenticator: Arc::new(JwtAuthenticator::new(SECRET)),
        calendar,
        calendar_connected_url: CONNECTED_URL.to_string(),
    };

    TestApp {
        app: router(state, &["http://frontend.test".to_string()]),
        store,
        provider,
        organizer,
        attendee,
        event,
    }
}

fn bearer(user_id: UserId) -> String {
    let claims = json!({
        "user_id": user_id,
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    });
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

fn request(method: &str, uri: &str, user: Option<UserId>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

// -- RSVP routes --

#[tokio::test]
async fn test_submit_then_read_own_rsvp() {
    let t = build(false);
    let uri = format!("/api/events/{}/rsvp", t.event);

    let (status, body) = send(&t.app, request("GET", &uri, Some(t.attendee), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) = send(
        &t.app,
        request("POST", &uri, Some(t.attendee), Some(json!({"status": "going"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "RSVP updated successfully");

    let (status, body) = send(
        &t.app,
        request("PUT", &uri, Some(t.attendee), Some(json!({"status": "maybe"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (_, body) = send(&t.app, request("GET", &uri, Some(t.attendee), None)).await;
    assert_eq!(body["status"], "maybe");
    assert_eq!(body["event_id"], t.event);
    assert_eq!(t.store.rsvp_row_count(t.event, t.attendee), 1);
}

#[tokio::test]
async fn test_submit_without_token_is_unauthorized() {
    let t = build(false);
    let uri = format!("/api/events/{}/rsvp", t.event);

    let (status, body) = send(
        &t.app,
        request("POST", &uri, None, Some(json!({"status": "going"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let forged = Request::builder()
        .method("POST")
        .uri(&uri)
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"status":"going"}"#))
        .unwrap();
    let (status, _) = send(&t.app, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(t.store.rsvp_mutation_count(), 0);
}

#[tokio::test]
async fn test_invalid_status_is_rejected_without_write() {
    let t = build(false);
    let uri = format!("/api/events/{}/rsvp", t.event);

    let (status, body) = send(
        &t.app,
        request("POST", &uri, Some(t.attendee), Some(json!({"status": "yes"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid status. Must be 'going', 'maybe', or 'not_going'"
    );
    assert_eq!(t.store.rsvp_mutation_count(), 0);
}

#[tokio::test]
async fn test_malformed_inputs_are_bad_requests() {
    let t = build(false);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/events/abc/rsvp",
            Some(t.attendee),
            Some(json!({"status": "going"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event ID");

    let raw = Request::builder()
        .method("POST")
        .uri(format!("/api/events/{}/rsvp", t.event))
        .header(header::AUTHORIZATION, bearer(t.attendee))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&t.app, raw).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn test_submit_for_missing_event_is_not_found() {
    let t = build(false);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/events/9999/rsvp",
            Some(t.attendee),
            Some(json!({"status": "going"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let t = build(false);
    let uri = format!("/api/events/{}/rsvp", t.event);

    send(
        &t.app,
        request("POST", &uri, Some(t.attendee), Some(json!({"status": "going"}))),
    )
    .await;

    for _ in 0..2 {
        let (status, body) = send(&t.app, request("DELETE", &uri, Some(t.attendee), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "RSVP deleted successfully");
    }
    assert_eq!(t.store.rsvp_row_count(t.event, t.attendee), 0);
}

#[tokio::test]
async fn test_count_is_public() {
    let t = build(false);
    let uri = format!("/api/events/{}/rsvp/count", t.event);

    let (status, body) = send(&t.app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"going": 0, "maybe": 0, "not_going": 0}));

    send(
        &t.app,
        request(
            "POST",
            &format!("/api/events/{}/rsvp", t.event),
            Some(t.attendee),
            Some(json!({"status": "not_going"})),
        ),
    )
    .await;

    let (_, body) = send(&t.app, request("GET", &uri, None, None)).await;
    assert_eq!(body, json!({"going": 0, "maybe": 0, "not_going": 1}));
}

#[tokio::test]
async fn test_attendee_list_is_owner_only() {
    let t = build(false);
    send(
        &t.app,
        request(
            "POST",
            &format!("/api/events/{}/rsvp", t.event),
            Some(t.attendee),
            Some(json!({"status": "going"})),
        ),
    )
    .await;
    let uri = format!("/api/events/{}/rsvps", t.event);

    let (status, body) = send(&t.app, request("GET", &uri, Some(t.attendee), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Unauthorized. Only the event creator can view the attendee list"
    );

    let (status, body) = send(&t.app, request("GET", &uri, Some(t.organizer), None)).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["email"], "alan@example.com");
    assert_eq!(list[0]["status"], "going");

    let (status, _) = send(
        &t.app,
        request("GET", "/api/events/4040/rsvps", Some(t.organizer), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Calendar routes --

#[tokio::test]
async fn test_calendar_routes_unavailable_without_credentials() {
    let t = build(false);

    let (status, _) = send(
        &t.app,
        request("GET", "/api/calendar/authorize", Some(t.attendee), None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/calendar/add-event",
            Some(t.attendee),
            Some(json!({"event_id": t.event})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_oauth_round_trip_connects_calendar() {
    let t = build(true);

    let (status, body) = send(
        &t.app,
        request("GET", "/api/calendar/authorize", Some(t.attendee), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let state = t.provider.last_state().unwrap();
    assert!(body["auth_url"].as_str().unwrap().contains(&state));

    let callback = format!("/api/calendar/callback?code=good-code&state={}", state);
    let response = t
        .app
        .clone()
        .oneshot(request("GET", &callback, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], CONNECTED_URL);
    assert!(t.store.token_for(t.attendee).is_some());

    let (_, body) = send(
        &t.app,
        request("GET", "/api/calendar/check-connection", Some(t.attendee), None),
    )
    .await;
    assert_eq!(body, json!({"connected": true}));

    // The nonce is single-use.
    let (status, _) = send(&t.app, request("GET", &callback, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.provider.exchange_count(), 1);
}

#[tokio::test]
async fn test_disconnect_forgets_token() {
    let t = build(true);
    t.store.put_token(
        t.attendee,
        CalendarToken {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() + Duration::hours(1)),
        },
    );

    let (status, body) = send(
        &t.app,
        request("DELETE", "/api/calendar/disconnect", Some(t.attendee), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"disconnected": true}));
    assert!(t.store.token_for(t.attendee).is_none());

    let (_, body) = send(
        &t.app,
        request("GET", "/api/calendar/check-connection", Some(t.attendee), None),
    )
    .await;
    assert_eq!(body, json!({"connected": false}));

    let (status, body) = send(
        &t.app,
        request("DELETE", "/api/calendar/disconnect", Some(t.attendee), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"disconnected": false}));
}

#[tokio::test]
async fn test_callback_with_forged_state_never_exchanges() {
    let t = build(true);

    let (status, body) = send(
        &t.app,
        request(
            "GET",
            &format!("/api/calendar/callback?code=c&state=user-{}-1700000000", t.attendee),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid state parameter");

    let (status, body) = send(
        &t.app,
        request("GET", "/api/calendar/callback?state=x", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing authorization code");

    assert_eq!(t.provider.exchange_count(), 0);
    assert_eq!(t.store.token_write_count(), 0);
}

#[tokio::test]
async fn test_add_event_requires_connected_calendar() {
    let t = build(true);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/calendar/add-event",
            Some(t.attendee),
            Some(json!({"event_id": t.event})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "authorization_required");
    assert_eq!(body["message"], "Google Calendar authorization required");
    assert_eq!(t.provider.insert_count(), 0);
}

#[tokio::test]
async fn test_add_event_refreshes_expired_token_first() {
    let t = build(true);
    t.store.put_token(
        t.attendee,
        CalendarToken {
            access_token: "stale".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() - Duration::minutes(1)),
        },
    );

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/calendar/add-event",
            Some(t.attendee),
            Some(json!({"event_id": t.event.to_string()})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Event added to Google Calendar successfully");
    assert_eq!(body["calendar_event"]["id"], "remote-1");

    assert_eq!(t.provider.refresh_count(), 1);
    assert_eq!(t.provider.insert_count(), 1);
    let stored = t.store.token_for(t.attendee).unwrap();
    assert_eq!(stored.access_token, "refreshed-access-1");
    assert_eq!(t.provider.inserted()[0].title, "Compiler Night");
}

#[tokio::test]
async fn test_add_event_accepts_literal_fields() {
    let t = build(true);
    t.store.put_token(
        t.attendee,
        CalendarToken {
            access_token: "live".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expiry: None,
        },
    );

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/calendar/add-event",
            Some(t.attendee),
            Some(json!({"title": "Offsite", "location": "Lisbon", "start": "2026-11-02T15:00:00Z"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let inserted = t.provider.inserted();
    assert_eq!(inserted[0].title, "Offsite");
    assert_eq!(inserted[0].location, "Lisbon");
    assert_eq!(t.provider.refresh_count(), 0);
}

#[tokio::test]
async fn test_add_event_rejects_bad_event_ids() {
    let t = build(true);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/calendar/add-event",
            Some(t.attendee),
            Some(json!({"event_id": "abc"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid event ID format");

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/calendar/add-event",
            Some(t.attendee),
            Some(json!({"event_id": 4040})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_without_database() {
    let t = build(false);
    let (status, body) = send(&t.app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "detached");
}
