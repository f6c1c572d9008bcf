//! # evently-calendar
//!
//! Optional Google Calendar sync for evently: OAuth authorization, token
//! persistence and refresh, and event insertion.

pub mod config;
pub mod coordinator;
pub mod google;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::GoogleCalendarConfig;
pub use coordinator::{generate_state_nonce, CalendarTokenCoordinator};
pub use google::GoogleCalendarProvider;
