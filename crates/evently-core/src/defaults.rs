//! Centralized default constants for evently.
//!
//! Crates reference these instead of defining their own magic numbers.
//! Environment variables documented on each config struct override them.

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Bounded queue size for pending notification tasks.
pub const NOTIFY_QUEUE_CAPACITY: usize = 256;

/// Background workers draining the notification queue.
pub const NOTIFY_WORKERS: usize = 4;

/// Per-message send timeout in seconds.
pub const NOTIFY_SEND_TIMEOUT_SECS: u64 = 30;

/// Default SMTP submission port.
pub const SMTP_PORT: u16 = 587;

/// Base URL used for links in notification emails.
pub const APP_BASE_URL: &str = "http://localhost:3000";

// =============================================================================
// CALENDAR
// =============================================================================

/// Duration applied when an event has no explicit end time.
pub const CALENDAR_EVENT_DURATION_HOURS: i64 = 2;

/// Lifetime of an issued OAuth state nonce.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

/// Random bytes in an OAuth state nonce (before base64).
pub const OAUTH_STATE_BYTES: usize = 32;

/// HTTP timeout for OAuth and calendar API calls.
pub const CALENDAR_HTTP_TIMEOUT_SECS: u64 = 30;

/// Scope requested for calendar sync.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";

// =============================================================================
// DATABASE POOL
// =============================================================================

pub const POOL_MAX_CONNECTIONS: u32 = 10;
pub const POOL_MIN_CONNECTIONS: u32 = 1;
pub const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 600;
pub const POOL_MAX_LIFETIME_SECS: u64 = 1800;

// =============================================================================
// SERVER
// =============================================================================

pub const SERVER_HOST: &str = "0.0.0.0";
pub const SERVER_PORT: u16 = 9000;
pub const FRONTEND_URL: &str = "http://localhost:5173";

/// OAuth callback registered with the calendar provider.
pub const CALENDAR_REDIRECT_URL: &str = "http://localhost:9000/api/calendar/callback";

/// Google client credentials file read when no client id is set.
pub const GOOGLE_CREDENTIALS_FILE: &str = "google_client_credentials.json";
