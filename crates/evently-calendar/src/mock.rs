//! Mock calendar provider for deterministic testing.
//!
//! ```rust,ignore
//! use evently_calendar::mock::MockCalendarProvider;
//!
//! let provider = MockCalendarProvider::new().failing_refresh();
//! // ... drive a CalendarTokenCoordinator with it ...
//! assert_eq!(provider.refresh_count(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use evently_core::{
    CalendarEventInput, CalendarProvider, CalendarToken, Error, RemoteEventRef, Result,
};

#[derive(Debug, Clone, Copy, Default)]
struct Failures {
    exchange: bool,
    refresh: bool,
    insert: bool,
}

/// Calendar provider that counts calls and returns canned tokens.
#[derive(Clone, Default)]
pub struct MockCalendarProvider {
    failures: Failures,
    exchanges: Arc<AtomicUsize>,
    refreshes: Arc<AtomicUsize>,
    inserts: Arc<AtomicUsize>,
    last_state: Arc<Mutex<Option<String>>>,
    inserted: Arc<Mutex<Vec<CalendarEventInput>>>,
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every authorization code.
    pub fn failing_exchange(mut self) -> Self {
        self.failures.exchange = true;
        self
    }

    /// Reject every refresh token.
    pub fn failing_refresh(mut self) -> Self {
        self.failures.refresh = true;
        self
    }

    /// Fail every event insert.
    pub fn failing_insert(mut self) -> Self {
        self.failures.insert = true;
        self
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// State passed to the most recent `authorization_url` call.
    pub fn last_state(&self) -> Option<String> {
        self.last_state.lock().unwrap().clone()
    }

    /// Events passed to successful inserts.
    pub fn inserted(&self) -> Vec<CalendarEventInput> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    fn authorization_url(&self, state: &str) -> Result<String> {
        *self.last_state.lock().unwrap() = Some(state.to_string());
        Ok(format!(
            "https://accounts.example.test/auth?state={}&access_type=offline",
            state
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<CalendarToken> {
        let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failures.exchange {
            return Err(Error::Exchange(format!("invalid_grant for code {}", code)));
        }
        Ok(CalendarToken {
            access_token: format!("access-from-code-{}", n),
            refresh_token: Some(format!("refresh-from-code-{}", n)),
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() + Duration::hours(1)),
        })
    }

    async fn refresh(&self, token: &CalendarToken) -> Result<CalendarToken> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failures.refresh {
            return Err(Error::Refresh("invalid_grant: token revoked".to_string()));
        }
        Ok(CalendarToken {
            access_token: format!("refreshed-access-{}", n),
            refresh_token: token.refresh_token.clone(),
            token_type: token.token_type.clone(),
            expiry: Some(Utc::now() + Duration::hours(1)),
        })
    }

    async fn insert_event(
        &self,
        _token: &CalendarToken,
        event: &CalendarEventInput,
    ) -> Result<RemoteEventRef> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failures.insert {
            return Err(Error::RemoteSync("Google API error (503): backend".to_string()));
        }
        self.inserted.lock().unwrap().push(event.clone());
        Ok(RemoteEventRef {
            id: format!("remote-{}", n),
            html_link: Some(format!("https://calendar.example.test/event/{}", n)),
            status: Some("confirmed".to_string()),
        })
    }
}
