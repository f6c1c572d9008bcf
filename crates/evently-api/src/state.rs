//! Shared handler state.

use std::sync::Arc;

use evently_calendar::CalendarTokenCoordinator;
use evently_core::Authenticator;
use evently_db::Database;

use crate::services::RsvpCoordinator;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool, probed by `/health`. Absent in router tests.
    pub db: Option<Database>,
    pub rsvps: Arc<RsvpCoordinator>,
    pub authenticator: Arc<dyn Authenticator>,
    /// None when Google credentials are not configured.
    pub calendar: Option<Arc<CalendarTokenCoordinator>>,
    /// Browser redirect target after a successful OAuth callback.
    pub calendar_connected_url: String,
}
