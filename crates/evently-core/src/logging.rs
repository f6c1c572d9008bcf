//! Structured logging field names for evently.
//!
//! All crates use these constants so log queries can filter on the same
//! field names in every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, work skipped or dropped |
//! | INFO  | Lifecycle events, completed state changes |
//! | DEBUG | Decision points (eligibility, skips, refresh) |
//! | TRACE | Per-row detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "notify", "calendar"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "coordinator", "dispatcher", "worker", "token_coordinator", "google"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "submit", "withdraw", "ensure_fresh", "send"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

pub const EVENT_ID: &str = "event_id";
pub const USER_ID: &str = "user_id";

/// Wire value of an RSVP status.
pub const RSVP_STATUS: &str = "rsvp_status";

/// Previous RSVP status, absent on first submission.
pub const PREVIOUS_STATUS: &str = "previous_status";

/// Notification kind ("organizer_notification", "attendee_confirmation").
pub const NOTIFICATION_KIND: &str = "notification_kind";

/// Transport name ("smtp", "log_only").
pub const TRANSPORT: &str = "transport";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows returned by a query.
pub const RESULT_COUNT: &str = "result_count";

/// Worker index within a pool.
pub const WORKER_ID: &str = "worker_id";
