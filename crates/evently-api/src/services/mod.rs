//! Service layer for business logic.

pub mod rsvp_coordinator;
pub mod state_resolver;

pub use rsvp_coordinator::RsvpCoordinator;
pub use state_resolver::RsvpStateResolver;
