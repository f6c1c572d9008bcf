//! Integration tests for the PostgreSQL RSVP and calendar token stores.
//!
//! Run with a migrated database:
//! `DATABASE_URL=postgres://... cargo test -p evently-db -- --ignored`

use std::sync::Arc;

use chrono::{Duration, Utc};
use evently_db::test_fixtures::{TestDataBuilder, TestDatabase};
use evently_db::{
    CalendarToken, CalendarTokenRepository, EventRepository, OAuthStateRepository,
    RsvpRepository, RsvpStatus,
};

/// Picks up `DATABASE_URL` from a local `.env` when present.
async fn connect_test_db() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_upsert_keeps_single_row_with_last_status() {
    let test_db = connect_test_db().await;
    let mut data = TestDataBuilder::new(&test_db.db);
    let organizer = data.user("Ada", "Lovelace").await;
    let attendee = data.user("Grace", "Hopper").await;
    let event = data.event(organizer, "Upsert Meetup").await;

    let first = test_db
        .db
        .rsvps
        .upsert(event, attendee, RsvpStatus::Going)
        .await
        .unwrap();
    test_db
        .db
        .rsvps
        .upsert(event, attendee, RsvpStatus::NotGoing)
        .await
        .unwrap();
    let last = test_db
        .db
        .rsvps
        .upsert(event, attendee, RsvpStatus::Maybe)
        .await
        .unwrap();

    assert_eq!(first.id, last.id, "upsert must update in place");
    assert!(last.updated_at >= first.updated_at);

    let rows = test_db.db.rsvps.list_for_event(event).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rsvp.status, RsvpStatus::Maybe);
    assert_eq!(rows[0].first_name, "Grace");

    data.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_concurrent_upserts_leave_one_row() {
    let test_db = connect_test_db().await;
    let mut data = TestDataBuilder::new(&test_db.db);
    let organizer = data.user("Ada", "Lovelace").await;
    let attendee = data.user("Grace", "Hopper").await;
    let event = data.event(organizer, "Race Meetup").await;

    let rsvps = Arc::clone(&test_db.db.rsvps);
    let mut handles = Vec::new();
    for i in 0..12 {
        let rsvps = Arc::clone(&rsvps);
        let status = RsvpStatus::ALL[i % 3];
        handles.push(tokio::spawn(async move {
            rsvps.upsert(event, attendee, status).await
        }));
    }
    let mut committed = Vec::new();
    for handle in handles {
        committed.push(handle.await.unwrap().unwrap());
    }

    let count = rsvps.count(event).await.unwrap();
    assert_eq!(count.total(), 1);

    let stored = rsvps.get(event, attendee).await.unwrap().unwrap();
    let last = committed.iter().max_by_key(|r| r.updated_at).unwrap();
    assert_eq!(stored, *last);

    let listed = rsvps.list_for_event(event).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].rsvp, stored);

    data.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_grouped_count_and_idempotent_delete() {
    let test_db = connect_test_db().await;
    let mut data = TestDataBuilder::new(&test_db.db);
    let organizer = data.user("Ada", "Lovelace").await;
    let event = data.event(organizer, "Count Meetup").await;

    let statuses = [
        RsvpStatus::Going,
        RsvpStatus::Going,
        RsvpStatus::Maybe,
        RsvpStatus::NotGoing,
    ];
    let mut attendees = Vec::new();
    for (i, status) in statuses.iter().enumerate() {
        let user = data.user(&format!("Guest{}", i), "Tester").await;
        test_db.db.rsvps.upsert(event, user, *status).await.unwrap();
        attendees.push(user);
    }

    let count = test_db.db.rsvps.count(event).await.unwrap();
    assert_eq!((count.going, count.maybe, count.not_going), (2, 1, 1));

    assert!(test_db.db.rsvps.delete(event, attendees[0]).await.unwrap());
    assert!(!test_db.db.rsvps.delete(event, attendees[0]).await.unwrap());

    let empty = data.event(organizer, "Empty Meetup").await;
    let zero = test_db.db.rsvps.count(empty).await.unwrap();
    assert_eq!(zero.total(), 0);

    data.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_event_loads_organizer_fields() {
    let test_db = connect_test_db().await;
    let mut data = TestDataBuilder::new(&test_db.db);
    let organizer = data.user("Ada", "Lovelace").await;
    let event = data.event(organizer, "Join Meetup").await;

    let loaded = test_db.db.events.get(event).await.unwrap().unwrap();
    assert_eq!(loaded.user_id, organizer);
    assert_eq!(loaded.organizer_first_name.as_deref(), Some("Ada"));
    assert!(test_db.db.events.get(-1).await.unwrap().is_none());

    data.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn test_calendar_token_overwrite_and_nonce_consume() {
    let test_db = connect_test_db().await;
    let mut data = TestDataBuilder::new(&test_db.db);
    let user = data.user("Ada", "Lovelace").await;

    let mut token = CalendarToken {
        access_token: "first".to_string(),
        refresh_token: Some("refresh".to_string()),
        token_type: "Bearer".to_string(),
        expiry: Some(Utc::now() + Duration::hours(1)),
    };
    test_db.db.calendar_tokens.store(user, &token).await.unwrap();
    token.access_token = "second".to_string();
    test_db.db.calendar_tokens.store(user, &token).await.unwrap();

    let loaded = test_db.db.calendar_tokens.load(user).await.unwrap().unwrap();
    assert_eq!(loaded.access_token, "second");

    assert!(test_db.db.calendar_tokens.delete(user).await.unwrap());
    assert!(!test_db.db.calendar_tokens.delete(user).await.unwrap());
    assert!(test_db.db.calendar_tokens.load(user).await.unwrap().is_none());

    let expires = Utc::now() + Duration::minutes(10);
    test_db
        .db
        .oauth_states
        .issue("fixture-nonce", user, expires)
        .await
        .unwrap();
    assert_eq!(
        test_db.db.oauth_states.consume("fixture-nonce").await.unwrap(),
        Some(user)
    );
    assert_eq!(
        test_db.db.oauth_states.consume("fixture-nonce").await.unwrap(),
        None
    );

    data.cleanup().await;
}
