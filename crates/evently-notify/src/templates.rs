//! Plain-text message templates for RSVP notifications.

use evently_core::defaults;
use evently_core::{EmailMessage, NotificationContext, NotificationKind};

/// Event date format, e.g. "Monday, November 2, 2026 at 6:30 PM".
const DATE_FORMAT: &str = "%A, %B %-d, %Y at %-I:%M %p";

/// Formats notification emails.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    /// Frontend origin used for event links.
    pub app_base_url: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::new(defaults::APP_BASE_URL)
    }
}

impl MessageTemplates {
    pub fn new(app_base_url: impl Into<String>) -> Self {
        Self {
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn event_link(&self, ctx: &NotificationContext) -> String {
        format!("{}/event/{}", self.app_base_url, ctx.event.id)
    }

    pub fn render(
        &self,
        kind: NotificationKind,
        recipient: &str,
        ctx: &NotificationContext,
    ) -> EmailMessage {
        match kind {
            NotificationKind::OrganizerNotification => self.organizer_notification(recipient, ctx),
            NotificationKind::AttendeeConfirmation => self.attendee_confirmation(recipient, ctx),
        }
    }

    fn organizer_notification(&self, recipient: &str, ctx: &NotificationContext) -> EmailMessage {
        let event = &ctx.event;
        let change = match ctx.previous_status {
            Some(previous) => format!(
                "changed their RSVP for your event \"{}\" from {} to {}",
                event.title,
                previous.label(),
                ctx.new_status.label()
            ),
            None => format!(
                "has RSVP'd to your event \"{}\" with status: {}",
                event.title,
                ctx.new_status.label()
            ),
        };

        let body = format!(
            "Hello,\n\n\
             {} {}.\n\n\
             Event Details:\n\
             - Date: {}\n\
             - Location: {}\n\n\
             You can view all RSVPs for this event at: {}\n\n\
             Thank you for using Evently!\n",
            ctx.attendee.full_name(),
            change,
            event.date.format(DATE_FORMAT),
            event.location,
            self.event_link(ctx),
        );

        EmailMessage {
            to: recipient.to_string(),
            subject: format!("New RSVP for {}", event.title),
            body,
        }
    }

    fn attendee_confirmation(&self, recipient: &str, ctx: &NotificationContext) -> EmailMessage {
        let event = &ctx.event;
        let body = format!(
            "Hello {},\n\n\
             Thank you for your RSVP to \"{}\". Your response has been recorded as: {}.\n\n\
             Event Details:\n\
             - Date: {}\n\
             - Location: {}\n\
             - Organizer: {}\n\n\
             You can view the event details at: {}\n\n\
             Thank you for using Evently!\n",
            ctx.attendee.first_name,
            event.title,
            ctx.new_status.label(),
            event.date.format(DATE_FORMAT),
            event.location,
            ctx.organizer_name(),
            self.event_link(ctx),
        );

        EmailMessage {
            to: recipient.to_string(),
            subject: format!("Your RSVP for {}", event.title),
            body,
        }
    }
}
