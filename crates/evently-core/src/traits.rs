//! Core traits for evently abstractions.
//!
//! Storage, transport and provider collaborators are expressed as traits so
//! the coordinators can be driven by PostgreSQL and HTTP in production and by
//! in-memory fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::*;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// Read access to events, including organizer display fields.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn get(&self, event_id: EventId) -> Result<Option<Event>>;
}

/// Read access to users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<User>>;
}

/// Durable RSVP records keyed by (event_id, user_id).
#[async_trait]
pub trait RsvpRepository: Send + Sync {
    /// Current record for the pair, if any.
    async fn get(&self, event_id: EventId, user_id: UserId) -> Result<Option<Rsvp>>;

    /// Insert or update in a single atomic statement and return the committed
    /// row. Concurrent writers for the same key resolve to last writer wins.
    async fn upsert(&self, event_id: EventId, user_id: UserId, status: RsvpStatus)
        -> Result<Rsvp>;

    /// Delete the record if present. Returns whether a row was removed.
    async fn delete(&self, event_id: EventId, user_id: UserId) -> Result<bool>;

    /// Per-status counts; categories with no rows are zero.
    async fn count(&self, event_id: EventId) -> Result<RsvpCount>;

    /// All RSVPs for the event with attendee fields, most recent first.
    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<RsvpWithUser>>;
}

/// One calendar token per user.
#[async_trait]
pub trait CalendarTokenRepository: Send + Sync {
    /// Insert or overwrite the token for `user_id`.
    async fn store(&self, user_id: UserId, token: &CalendarToken) -> Result<()>;

    async fn load(&self, user_id: UserId) -> Result<Option<CalendarToken>>;

    async fn delete(&self, user_id: UserId) -> Result<bool>;
}

/// Anti-forgery nonces issued for the OAuth authorize redirect.
#[async_trait]
pub trait OAuthStateRepository: Send + Sync {
    async fn issue(&self, nonce: &str, user_id: UserId, expires_at: DateTime<Utc>) -> Result<()>;

    /// Remove the nonce and return its user. Expired or unknown nonces yield
    /// `None`; a nonce matches at most once.
    async fn consume(&self, nonce: &str) -> Result<Option<UserId>>;
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Outbound message delivery (SMTP in production).
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;

    fn name(&self) -> &str {
        "transport"
    }
}

/// Third-party calendar with OAuth2 authorization.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Consent URL carrying `state`. Pure; performs no I/O.
    fn authorization_url(&self, state: &str) -> Result<String>;

    /// Trade an authorization code for a token. Fails with `Error::Exchange`.
    async fn exchange_code(&self, code: &str) -> Result<CalendarToken>;

    /// Obtain a fresh access token. Fails with `Error::Refresh`.
    async fn refresh(&self, token: &CalendarToken) -> Result<CalendarToken>;

    /// Create an entry in the user's primary calendar. Fails with `Error::RemoteSync`.
    async fn insert_event(
        &self,
        token: &CalendarToken,
        event: &CalendarEventInput,
    ) -> Result<RemoteEventRef>;
}

/// Verifies a bearer credential and yields the caller's identity.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, bearer: &str) -> Result<UserId>;
}
