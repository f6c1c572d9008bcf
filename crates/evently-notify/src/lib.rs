//! # evently-notify
//!
//! Asynchronous RSVP notifications for evently.
//!
//! - [`NotificationDispatcher`]: bounded queue plus background workers
//! - [`MessageTemplates`]: organizer and attendee email bodies
//! - [`SmtpTransport`] / [`LogOnlyTransport`]: delivery

pub mod config;
pub mod dispatcher;
pub mod smtp;
pub mod templates;

pub use config::{DispatcherConfig, SmtpConfig};
pub use dispatcher::{DispatcherSnapshot, NotificationDispatcher, NotificationTask};
pub use smtp::{LogOnlyTransport, SmtpTransport};
pub use templates::MessageTemplates;

use std::sync::Arc;

use evently_core::{NotificationTransport, Result};
use tracing::info;

/// Pick the SMTP transport when configured, otherwise the log-only one.
pub fn transport_from_config(smtp: Option<&SmtpConfig>) -> Result<Arc<dyn NotificationTransport>> {
    match smtp {
        Some(config) => {
            info!(
                subsystem = "notify",
                component = "transport",
                smtp_host = %config.host,
                smtp_port = config.port,
                "Using SMTP email transport"
            );
            Ok(Arc::new(SmtpTransport::new(config)?))
        }
        None => {
            info!(
                subsystem = "notify",
                component = "transport",
                "SMTP not configured, emails will be logged only"
            );
            Ok(Arc::new(LogOnlyTransport))
        }
    }
}
