//! RSVP submission, withdrawal and read paths.
//!
//! A submission is durable once the upsert commits. Notifications are handed
//! to the [`NotificationDispatcher`] afterwards and never awaited, so a slow or
//! failing mail server cannot fail or delay the response.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use evently_core::{
    Error, Event, EventId, EventRepository, NotificationContext, NotificationKind, Result, Rsvp,
    RsvpCount, RsvpRepository, RsvpStatus, RsvpWithUser, User, UserId, UserRepository,
};
use evently_notify::NotificationDispatcher;

use super::state_resolver::RsvpStateResolver;

pub const INVALID_STATUS_MESSAGE: &str =
    "Invalid status. Must be 'going', 'maybe', or 'not_going'";

/// Orchestrates the RSVP write path and its notifications.
pub struct RsvpCoordinator {
    events: Arc<dyn EventRepository>,
    users: Arc<dyn UserRepository>,
    rsvps: Arc<dyn RsvpRepository>,
    resolver: RsvpStateResolver,
    dispatcher: Arc<NotificationDispatcher>,
}

impl RsvpCoordinator {
    pub fn new(
        events: Arc<dyn EventRepository>,
        users: Arc<dyn UserRepository>,
        rsvps: Arc<dyn RsvpRepository>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            resolver: RsvpStateResolver::new(Arc::clone(&rsvps)),
            events,
            users,
            rsvps,
            dispatcher,
        }
    }

    /// Parse a wire status. Case-sensitive.
    pub fn parse_status(raw: &str) -> Result<RsvpStatus> {
        raw.parse()
            .map_err(|_| Error::Validation(INVALID_STATUS_MESSAGE.to_string()))
    }

    /// Load an event or fail with `NotFound`.
    pub async fn event(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get(event_id)
            .await?
            .ok_or_else(|| Error::NotFound("Event not found".to_string()))
    }

    /// Record `status` for the user and notify on new or changed RSVPs.
    ///
    /// An invalid status fails before any store access. Any store failure
    /// aborts the submission with nothing written.
    pub async fn submit(&self, event_id: EventId, user_id: UserId, status: &str) -> Result<Rsvp> {
        let start = Instant::now();
        let status = Self::parse_status(status)?;

        let event = self.event(event_id).await?;
        let resolved = self.resolver.resolve(event_id, user_id, status).await?;
        let attendee = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let rsvp = self.rsvps.upsert(event_id, user_id, status).await?;

        info!(
            subsystem = "rsvp",
            component = "coordinator",
            op = "submit",
            event_id,
            user_id,
            rsvp_status = %status,
            previous_status = resolved.previous_status.map(|s| s.as_str()),
            is_new = resolved.is_new,
            is_transition = resolved.is_transition,
            duration_ms = start.elapsed().as_millis() as u64,
            "RSVP recorded"
        );

        if resolved.is_notification_eligible() {
            self.notify(event, attendee, resolved.previous_status, status);
        } else {
            debug!(
                subsystem = "rsvp",
                component = "coordinator",
                event_id,
                user_id,
                "Status unchanged, no notifications"
            );
        }

        Ok(rsvp)
    }

    /// Hand both notifications to the dispatcher. Organizer fields come from
    /// the event join, so nothing here touches a store.
    fn notify(
        &self,
        event: Event,
        attendee: User,
        previous_status: Option<RsvpStatus>,
        new_status: RsvpStatus,
    ) {
        let context = Arc::new(NotificationContext {
            event,
            attendee,
            previous_status,
            new_status,
        });

        self.dispatcher.dispatch(
            NotificationKind::OrganizerNotification,
            context.organizer_email(),
            Arc::clone(&context),
        );
        self.dispatcher.dispatch(
            NotificationKind::AttendeeConfirmation,
            Some(context.attendee.email.as_str()),
            Arc::clone(&context),
        );
    }

    /// Remove the user's RSVP. Succeeds whether or not one existed.
    pub async fn withdraw(&self, event_id: EventId, user_id: UserId) -> Result<()> {
        let removed = self.rsvps.delete(event_id, user_id).await?;
        debug!(
            subsystem = "rsvp",
            component = "coordinator",
            op = "withdraw",
            event_id,
            user_id,
            removed,
            "RSVP withdrawn"
        );
        Ok(())
    }

    pub async fn get_rsvp(&self, event_id: EventId, user_id: UserId) -> Result<Option<Rsvp>> {
        self.rsvps.get(event_id, user_id).await
    }

    /// Per-status counts. Unknown events simply count zero.
    pub async fn get_count(&self, event_id: EventId) -> Result<RsvpCount> {
        self.rsvps.count(event_id).await
    }

    /// Attendee list, most recent first. Only the event's organizer may read it.
    pub async fn list(&self, event_id: EventId, requester: UserId) -> Result<Vec<RsvpWithUser>> {
        let event = self.event(event_id).await?;
        if !event.is_owned_by(requester) {
            return Err(Error::Forbidden(
                "Unauthorized. Only the event creator can view the attendee list".to_string(),
            ));
        }
        self.rsvps.list_for_event(event_id).await
    }
}
