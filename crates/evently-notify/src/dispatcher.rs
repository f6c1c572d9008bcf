//! Fire-and-forget notification dispatch.
//!
//! A bounded queue feeds a fixed set of background workers. The request path
//! only enqueues; it never waits for delivery and never sees a send failure.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use evently_core::{NotificationContext, NotificationKind, NotificationTransport};

use crate::config::DispatcherConfig;
use crate::templates::MessageTemplates;

/// One unit of notification work. Not persisted.
#[derive(Debug, Clone)]
pub struct NotificationTask {
    pub kind: NotificationKind,
    pub recipient: String,
    pub context: Arc<NotificationContext>,
}

/// Counters for dispatcher outcomes.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub queued: AtomicU64,
    pub skipped: AtomicU64,
    pub dropped: AtomicU64,
    pub sent: AtomicU64,
    pub failed: AtomicU64,
}

/// Point-in-time copy of [`DispatcherStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherSnapshot {
    pub queued: u64,
    pub skipped: u64,
    pub dropped: u64,
    pub sent: u64,
    pub failed: u64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Handle for scheduling notification tasks.
pub struct NotificationDispatcher {
    sender: mpsc::Sender<NotificationTask>,
    stats: Arc<DispatcherStats>,
    workers: Vec<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Start `config.worker_count` workers sharing one bounded queue.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        transport: Arc<dyn NotificationTransport>,
        templates: MessageTemplates,
        config: DispatcherConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let stats = Arc::new(DispatcherStats::default());
        let templates = Arc::new(templates);

        info!(
            subsystem = "notify",
            component = "dispatcher",
            op = "spawn",
            transport = transport.name(),
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            send_timeout_secs = config.send_timeout.as_secs(),
            "Starting notification workers"
        );

        let workers = (0..config.worker_count.max(1))
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    receiver: Arc::clone(&receiver),
                    transport: Arc::clone(&transport),
                    templates: Arc::clone(&templates),
                    stats: Arc::clone(&stats),
                    config: config.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self {
            sender,
            stats,
            workers,
        }
    }

    /// Schedule a notification. Never blocks and never fails.
    ///
    /// An empty or missing recipient skips the task. A full or closed queue
    /// drops it.
    pub fn dispatch(
        &self,
        kind: NotificationKind,
        recipient: Option<&str>,
        context: Arc<NotificationContext>,
    ) {
        let recipient = match recipient.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None => {
                self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    subsystem = "notify",
                    component = "dispatcher",
                    op = "dispatch",
                    notification_kind = %kind,
                    event_id = context.event.id,
                    "No recipient address, skipping notification"
                );
                return;
            }
        };

        let task = NotificationTask {
            kind,
            recipient,
            context,
        };

        match self.sender.try_send(task) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(task)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subsystem = "notify",
                    component = "dispatcher",
                    op = "dispatch",
                    notification_kind = %task.kind,
                    event_id = task.context.event.id,
                    "Notification queue full, dropping task"
                );
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subsystem = "notify",
                    component = "dispatcher",
                    op = "dispatch",
                    notification_kind = %task.kind,
                    event_id = task.context.event.id,
                    "Notification queue closed, dropping task"
                );
            }
        }
    }

    pub fn stats(&self) -> DispatcherSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<NotificationTask>>>,
    transport: Arc<dyn NotificationTransport>,
    templates: Arc<MessageTemplates>,
    stats: Arc<DispatcherStats>,
    config: DispatcherConfig,
}

impl Worker {
    async fn run(self) {
        loop {
            // Hold the lock only while waiting for the next task.
            let next = { self.receiver.lock().await.recv().await };
            let Some(task) = next else {
                debug!(
                    subsystem = "notify",
                    component = "worker",
                    worker_id = self.id,
                    "Queue closed, worker exiting"
                );
                return;
            };
            self.process(task).await;
        }
    }

    async fn process(&self, task: NotificationTask) {
        let start = Instant::now();
        let message = self
            .templates
            .render(task.kind, &task.recipient, &task.context);
        let transport = Arc::clone(&self.transport);
        let send_timeout = self.config.send_timeout;

        // Separate task so a panicking transport cannot take the worker down.
        let handle = tokio::spawn(async move {
            tokio::time::timeout(send_timeout, transport.send(&message)).await
        });

        let kind = task.kind;
        let event_id = task.context.event.id;
        match handle.await {
            Ok(Ok(Ok(()))) => {
                self.stats.sent.fetch_add(1, Ordering::Relaxed);
                debug!(
                    subsystem = "notify",
                    component = "worker",
                    op = "send",
                    worker_id = self.id,
                    notification_kind = %kind,
                    event_id,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Notification delivered"
                );
            }
            Ok(Ok(Err(e))) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subsystem = "notify",
                    component = "worker",
                    op = "send",
                    worker_id = self.id,
                    notification_kind = %kind,
                    event_id,
                    error = %e,
                    "Notification send failed"
                );
            }
            Ok(Err(_elapsed)) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subsystem = "notify",
                    component = "worker",
                    op = "send",
                    worker_id = self.id,
                    notification_kind = %kind,
                    event_id,
                    timeout_secs = send_timeout.as_secs(),
                    "Notification send timed out"
                );
            }
            Err(join_error) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    subsystem = "notify",
                    component = "worker",
                    op = "send",
                    worker_id = self.id,
                    notification_kind = %kind,
                    event_id,
                    error = %join_error,
                    "Notification task panicked"
                );
            }
        }
    }
}
