//! HTTP handlers.

pub mod calendar;
pub mod health;
pub mod rsvp;
