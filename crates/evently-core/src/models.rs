//! Domain models for evently.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults;

/// Identifier of an event (SERIAL key).
pub type EventId = i32;

/// Identifier of a user (SERIAL key).
pub type UserId = i32;

// =============================================================================
// RSVP TYPES
// =============================================================================

/// Attendance intent for an event.
///
/// Wire values are exactly `going`, `maybe` and `not_going`. Parsing is
/// case-sensitive: `"Going"` is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

impl RsvpStatus {
    pub const ALL: [RsvpStatus; 3] = [Self::Going, Self::Maybe, Self::NotGoing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Going => "going",
            Self::Maybe => "maybe",
            Self::NotGoing => "not_going",
        }
    }

    /// Human-readable label used in notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Going => "Going",
            Self::Maybe => "Maybe",
            Self::NotGoing => "Not Going",
        }
    }
}

impl std::fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RsvpStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "going" => Ok(Self::Going),
            "maybe" => Ok(Self::Maybe),
            "not_going" => Ok(Self::NotGoing),
            _ => Err(format!("Invalid RSVP status: {}", s)),
        }
    }
}

/// A stored RSVP. At most one exists per (event_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: i32,
    pub event_id: EventId,
    pub user_id: UserId,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// RSVP joined with the attendee's display fields, as shown to organizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsvpWithUser {
    #[serde(flatten)]
    pub rsvp: Rsvp,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Per-status counts for one event, computed on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpCount {
    pub going: i64,
    pub maybe: i64,
    pub not_going: i64,
}

impl RsvpCount {
    pub fn total(&self) -> i64 {
        self.going + self.maybe + self.not_going
    }

    /// Increment the bucket for `status`.
    pub fn record(&mut self, status: RsvpStatus) {
        match status {
            RsvpStatus::Going => self.going += 1,
            RsvpStatus::Maybe => self.maybe += 1,
            RsvpStatus::NotGoing => self.not_going += 1,
        }
    }
}

/// Outcome of comparing an incoming status with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedState {
    pub is_new: bool,
    pub is_transition: bool,
    pub previous_status: Option<RsvpStatus>,
}

impl ResolvedState {
    pub fn from_previous(previous: Option<RsvpStatus>, new_status: RsvpStatus) -> Self {
        Self {
            is_new: previous.is_none(),
            is_transition: previous.is_some_and(|p| p != new_status),
            previous_status: previous,
        }
    }

    /// Resubmitting the same status is not notification-worthy.
    pub fn is_notification_eligible(&self) -> bool {
        self.is_new || self.is_transition
    }
}

// =============================================================================
// EVENT / USER CONTEXT
// =============================================================================

/// An event, with organizer display fields when loaded through a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    /// Organizer (owner) of the event.
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_email: Option<String>,
}

impl Event {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Organizer display name from the joined fields, if present.
    pub fn organizer_name(&self) -> Option<String> {
        match (&self.organizer_first_name, &self.organizer_last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// =============================================================================
// CALENDAR TYPES
// =============================================================================

/// OAuth credential material for a user's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Absent expiry means the token never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl CalendarToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// Fields sent to the remote calendar when creating an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl CalendarEventInput {
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: event.date,
            end: None,
        }
    }

    /// Explicit end time, or start plus the default event duration.
    pub fn resolved_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or_else(|| {
            self.start + Duration::hours(defaults::CALENDAR_EVENT_DURATION_HOURS)
        })
    }
}

/// Reference to the entry created in the remote calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEventRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// =============================================================================
// NOTIFICATION TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrganizerNotification,
    AttendeeConfirmation,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrganizerNotification => write!(f, "organizer_notification"),
            Self::AttendeeConfirmation => write!(f, "attendee_confirmation"),
        }
    }
}

/// Snapshot of everything a notification message is formatted from.
///
/// Owned by the notification tasks, never shared mutably with the request.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationContext {
    pub event: Event,
    pub attendee: User,
    pub previous_status: Option<RsvpStatus>,
    pub new_status: RsvpStatus,
}

impl NotificationContext {
    pub fn organizer_name(&self) -> String {
        self.event.organizer_name().unwrap_or_default()
    }

    /// Organizer address from the event join, if the organizer has one.
    pub fn organizer_email(&self) -> Option<&str> {
        self.event
            .organizer_email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
    }
}

/// A formatted email ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}
