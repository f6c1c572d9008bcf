//! In-memory repositories and transports for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use evently_core::mock::{MemoryStore, RecordingTransport};
//!
//! let store = MemoryStore::new();
//! let organizer = store.add_user("ada@example.com", "Ada", "Lovelace");
//! let event = store.add_event(organizer, "Rust Meetup", chrono::Utc::now());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::*;

#[derive(Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, Event>,
    rsvps: HashMap<(EventId, UserId), Rsvp>,
    tokens: HashMap<UserId, CalendarToken>,
    oauth_states: HashMap<String, (UserId, DateTime<Utc>)>,
    next_user_id: UserId,
    next_event_id: EventId,
    next_rsvp_id: i32,
    // Monotonic tiebreak so most-recent-first ordering is stable.
    rsvp_seq: HashMap<(EventId, UserId), u64>,
    seq: u64,
}

/// In-memory implementation of every repository trait.
///
/// All state sits behind one lock, so `upsert` is atomic and concurrent
/// writers for the same key resolve to last writer wins.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    unavailable: Arc<AtomicBool>,
    rsvp_mutations: Arc<AtomicUsize>,
    token_writes: Arc<AtomicUsize>,
}

fn unavailable_error() -> Error {
    Error::Database(sqlx::Error::PoolTimedOut)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user and return its id.
    pub fn add_user(&self, email: &str, first_name: &str, last_name: &str) -> UserId {
        let mut state = self.state.lock().unwrap();
        state.next_user_id += 1;
        let id = state.next_user_id;
        state.users.insert(
            id,
            User {
                id,
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            },
        );
        id
    }

    /// Seed an event owned by `organizer` and return its id.
    pub fn add_event(&self, organizer: UserId, title: &str, date: DateTime<Utc>) -> EventId {
        let mut state = self.state.lock().unwrap();
        state.next_event_id += 1;
        let id = state.next_event_id;
        let owner = state.users.get(&organizer).cloned();
        let now = Utc::now();
        state.events.insert(
            id,
            Event {
                id,
                title: title.to_string(),
                description: format!("{} description", title),
                date,
                location: "Main Hall".to_string(),
                user_id: organizer,
                created_at: now,
                updated_at: now,
                organizer_first_name: owner.as_ref().map(|u| u.first_name.clone()),
                organizer_last_name: owner.as_ref().map(|u| u.last_name.clone()),
                organizer_email: owner.map(|u| u.email),
            },
        );
        id
    }

    /// Remove a user row. Events keep their joined organizer fields.
    pub fn remove_user(&self, user_id: UserId) {
        self.state.lock().unwrap().users.remove(&user_id);
    }

    /// Make every subsequent call fail with a store error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of RSVP upserts and deletes performed.
    pub fn rsvp_mutation_count(&self) -> usize {
        self.rsvp_mutations.load(Ordering::SeqCst)
    }

    /// Number of RSVP rows stored for the pair (0 or 1).
    pub fn rsvp_row_count(&self, event_id: EventId, user_id: UserId) -> usize {
        usize::from(
            self.state
                .lock()
                .unwrap()
                .rsvps
                .contains_key(&(event_id, user_id)),
        )
    }

    /// Number of calendar token writes performed.
    pub fn token_write_count(&self) -> usize {
        self.token_writes.load(Ordering::SeqCst)
    }

    /// Peek at a stored token without going through the trait.
    pub fn token_for(&self, user_id: UserId) -> Option<CalendarToken> {
        self.state.lock().unwrap().tokens.get(&user_id).cloned()
    }

    /// Seed a token directly.
    pub fn put_token(&self, user_id: UserId, token: CalendarToken) {
        self.state.lock().unwrap().tokens.insert(user_id, token);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable_error());
        }
        Ok(())
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn get(&self, event_id: EventId) -> Result<Option<Event>> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().events.get(&event_id).cloned())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
    }
}

#[async_trait]
impl RsvpRepository for MemoryStore {
    async fn get(&self, event_id: EventId, user_id: UserId) -> Result<Option<Rsvp>> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .rsvps
            .get(&(event_id, user_id))
            .cloned())
    }

    async fn upsert(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: RsvpStatus,
    ) -> Result<Rsvp> {
        self.check_available()?;
        self.rsvp_mutations.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        let key = (event_id, user_id);
        let now = match state.rsvps.get(&key) {
            // Strictly increasing per row, so the latest write has the newest stamp.
            Some(prev) if prev.updated_at >= Utc::now() => {
                prev.updated_at + chrono::Duration::microseconds(1)
            }
            _ => Utc::now(),
        };
        let rsvp = match state.rsvps.get(&key).cloned() {
            Some(mut existing) => {
                existing.status = status;
                existing.updated_at = now;
                existing
            }
            None => {
                state.next_rsvp_id += 1;
                state.seq += 1;
                let seq = state.seq;
                state.rsvp_seq.insert(key, seq);
                Rsvp {
                    id: state.next_rsvp_id,
                    event_id,
                    user_id,
                    status,
                    created_at: now,
                    updated_at: now,
                }
            }
        };
        state.rsvps.insert(key, rsvp.clone());
        Ok(rsvp)
    }

    async fn delete(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        self.check_available()?;
        self.rsvp_mutations.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        state.rsvp_seq.remove(&(event_id, user_id));
        Ok(state.rsvps.remove(&(event_id, user_id)).is_some())
    }

    async fn count(&self, event_id: EventId) -> Result<RsvpCount> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        let mut count = RsvpCount::default();
        for rsvp in state.rsvps.values().filter(|r| r.event_id == event_id) {
            count.record(rsvp.status);
        }
        Ok(count)
    }

    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<RsvpWithUser>> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<(u64, RsvpWithUser)> = state
            .rsvps
            .iter()
            .filter(|((e, _), _)| *e == event_id)
            .filter_map(|(key, rsvp)| {
                let user = state.users.get(&rsvp.user_id)?;
                let seq = state.rsvp_seq.get(key).copied().unwrap_or_default();
                Some((
                    seq,
                    RsvpWithUser {
                        rsvp: rsvp.clone(),
                        first_name: user.first_name.clone(),
                        last_name: user.last_name.clone(),
                        email: user.email.clone(),
                    },
                ))
            })
            .collect();
        rows.sort_by(|a, b| {
            b.1.rsvp
                .created_at
                .cmp(&a.1.rsvp.created_at)
                .then(b.0.cmp(&a.0))
        });
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

#[async_trait]
impl CalendarTokenRepository for MemoryStore {
    async fn store(&self, user_id: UserId, token: &CalendarToken) -> Result<()> {
        self.check_available()?;
        self.token_writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .tokens
            .insert(user_id, token.clone());
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<Option<CalendarToken>> {
        self.check_available()?;
        Ok(self.token_for(user_id))
    }

    async fn delete(&self, user_id: UserId) -> Result<bool> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().tokens.remove(&user_id).is_some())
    }
}

#[async_trait]
impl OAuthStateRepository for MemoryStore {
    async fn issue(&self, nonce: &str, user_id: UserId, expires_at: DateTime<Utc>) -> Result<()> {
        self.check_available()?;
        self.state
            .lock()
            .unwrap()
            .oauth_states
            .insert(nonce.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn consume(&self, nonce: &str) -> Result<Option<UserId>> {
        self.check_available()?;
        let entry = self.state.lock().unwrap().oauth_states.remove(nonce);
        Ok(entry
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(user_id, _)| user_id))
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[derive(Clone, Default)]
struct TransportBehavior {
    fail_for: Vec<String>,
    panic_for: Vec<String>,
    delay: Option<Duration>,
}

/// Notification transport that records every delivered message.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    behavior: Arc<TransportBehavior>,
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail sends addressed to `recipient`.
    pub fn failing_for(mut self, recipient: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.behavior)
            .fail_for
            .push(recipient.into());
        self
    }

    /// Panic on sends addressed to `recipient`.
    pub fn panicking_for(mut self, recipient: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.behavior)
            .panic_for
            .push(recipient.into());
        self
    }

    /// Sleep before every send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        Arc::make_mut(&mut self.behavior).delay = Some(delay);
        self
    }

    /// Messages delivered successfully so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<EmailMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == recipient)
            .collect()
    }

    /// Finished send attempts, including failed ones. Sends cut off by a
    /// timeout are not counted.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` attempts were made. Returns false on timeout.
    pub async fn wait_for_attempts(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.attempt_count() >= n {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if let Some(delay) = self.behavior.delay {
            tokio::time::sleep(delay).await;
        }
        // Counted after the outcome is recorded, so waiters see final state.
        if self.behavior.panic_for.contains(&message.to) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            panic!("transport panicked for {}", message.to);
        }
        if self.behavior.fail_for.contains(&message.to) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Notification(format!(
                "mailbox unavailable: {}",
                message.to
            )));
        }
        self.sent.lock().unwrap().push(message.clone());
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
