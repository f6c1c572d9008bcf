//! Dispatcher and SMTP configuration.

use std::time::Duration;

use evently_core::defaults;

/// Configuration for the notification dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Pending tasks beyond this are dropped.
    pub queue_capacity: usize,
    /// Background workers draining the queue.
    pub worker_count: usize,
    /// Upper bound on a single send.
    pub send_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::NOTIFY_QUEUE_CAPACITY,
            worker_count: defaults::NOTIFY_WORKERS,
            send_timeout: Duration::from_secs(defaults::NOTIFY_SEND_TIMEOUT_SECS),
        }
    }
}

impl DispatcherConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTIFY_QUEUE_CAPACITY` | `256` | Bounded queue size |
    /// | `NOTIFY_WORKERS` | `4` | Background workers |
    /// | `NOTIFY_SEND_TIMEOUT_SECS` | `30` | Per-message send timeout |
    pub fn from_env() -> Self {
        let queue_capacity = std::env::var("NOTIFY_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::NOTIFY_QUEUE_CAPACITY)
            .max(1);

        let worker_count = std::env::var("NOTIFY_WORKERS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::NOTIFY_WORKERS)
            .max(1);

        let send_timeout = std::env::var("NOTIFY_SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(defaults::NOTIFY_SEND_TIMEOUT_SECS));

        Self {
            queue_capacity,
            worker_count,
            send_timeout,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl SmtpConfig {
    /// Load from the environment. Returns `None` unless host, username,
    /// password and sender address are all set.
    ///
    /// | Variable | Required | Description |
    /// |----------|----------|-------------|
    /// | `SMTP_HOST` | yes | Relay host |
    /// | `SMTP_PORT` | no (`587`) | Relay port |
    /// | `SMTP_USERNAME` | yes | Auth username |
    /// | `SMTP_PASSWORD` | yes | Auth password |
    /// | `FROM_EMAIL` | yes | Sender address |
    /// | `FROM_NAME` | no | Sender display name |
    pub fn from_env() -> Option<Self> {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let port = non_empty("SMTP_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults::SMTP_PORT);

        Some(Self {
            host: non_empty("SMTP_HOST")?,
            port,
            username: non_empty("SMTP_USERNAME")?,
            password: non_empty("SMTP_PASSWORD")?,
            from_email: non_empty("FROM_EMAIL")?,
            from_name: non_empty("FROM_NAME"),
        })
    }

    /// `From` header value.
    pub fn from_header(&self) -> String {
        match &self.from_name {
            Some(name) => format!("{} <{}>", name, self.from_email),
            None => self.from_email.clone(),
        }
    }
}
