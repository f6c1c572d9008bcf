//! Email transports.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use evently_core::{EmailMessage, Error, NotificationTransport, Result};

use crate::config::SmtpConfig;

/// SMTP transport using Lettre's tokio executor (STARTTLS relay).
#[derive(Clone)]
pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_header: String,
}

impl SmtpTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| Error::Config(format!("SMTP relay error: {}", e)))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            mailer,
            from_header: config.from_header(),
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message> {
        Message::builder()
            .from(
                self.from_header
                    .parse()
                    .map_err(|e| Error::Config(format!("Invalid from address: {}", e)))?,
            )
            .to(message
                .to
                .parse()
                .map_err(|e| Error::Notification(format!("Invalid to address: {}", e)))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| Error::Notification(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl NotificationTransport for SmtpTransport {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = self.build(message)?;
        match self.mailer.send(email).await {
            Ok(_) => {
                info!(
                    subsystem = "notify",
                    component = "smtp",
                    op = "send",
                    recipient = %message.to,
                    "Email sent"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    subsystem = "notify",
                    component = "smtp",
                    op = "send",
                    recipient = %message.to,
                    error = %e,
                    "Error sending email"
                );
                Err(Error::Notification(format!("Failed to send email: {}", e)))
            }
        }
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Transport used when SMTP is not configured. Logs and reports success.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyTransport;

#[async_trait]
impl NotificationTransport for LogOnlyTransport {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            subsystem = "notify",
            component = "log_only",
            op = "send",
            recipient = %message.to,
            subject = %message.subject,
            "Email service not configured, skipping email send"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log_only"
    }
}
