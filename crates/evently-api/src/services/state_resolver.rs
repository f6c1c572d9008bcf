//! Decides whether an incoming RSVP is new, a status change, or a resubmission.

use std::sync::Arc;

use evently_core::{EventId, ResolvedState, Result, RsvpRepository, RsvpStatus, UserId};

/// Reads the stored RSVP and compares it with the incoming status.
#[derive(Clone)]
pub struct RsvpStateResolver {
    rsvps: Arc<dyn RsvpRepository>,
}

impl RsvpStateResolver {
    pub fn new(rsvps: Arc<dyn RsvpRepository>) -> Self {
        Self { rsvps }
    }

    /// Store read errors propagate unchanged; the submission must abort.
    pub async fn resolve(
        &self,
        event_id: EventId,
        user_id: UserId,
        new_status: RsvpStatus,
    ) -> Result<ResolvedState> {
        let previous = self.rsvps.get(event_id, user_id).await?.map(|r| r.status);
        Ok(ResolvedState::from_previous(previous, new_status))
    }
}
