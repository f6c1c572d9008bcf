//! Calendar token lifecycle: authorize, persist, refresh, sync.
//!
//! Per user the token moves `Disconnected -> Connected(valid) ->
//! Connected(expired) -> Connected(valid)`. Refresh happens inline on the
//! request that finds the token stale, because the caller needs the fresh
//! token for the call that follows.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use tracing::{debug, info, warn};

use evently_core::defaults;
use evently_core::{
    CalendarEventInput, CalendarProvider, CalendarToken, CalendarTokenRepository, Error,
    OAuthStateRepository, RemoteEventRef, Result, UserId,
};

/// Coordinates OAuth tokens for the calendar sync path.
pub struct CalendarTokenCoordinator {
    provider: Arc<dyn CalendarProvider>,
    tokens: Arc<dyn CalendarTokenRepository>,
    states: Arc<dyn OAuthStateRepository>,
    state_ttl: Duration,
}

impl CalendarTokenCoordinator {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        tokens: Arc<dyn CalendarTokenRepository>,
        states: Arc<dyn OAuthStateRepository>,
    ) -> Self {
        Self {
            provider,
            tokens,
            states,
            state_ttl: Duration::seconds(defaults::OAUTH_STATE_TTL_SECS),
        }
    }

    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Consent URL for an already issued nonce. No store access.
    pub fn get_auth_url(&self, state_nonce: &str) -> Result<String> {
        self.provider.authorization_url(state_nonce)
    }

    /// Issue a fresh single-use nonce for `user_id` and return the consent URL.
    pub async fn begin_authorization(&self, user_id: UserId) -> Result<String> {
        let nonce = generate_state_nonce();
        let expires_at = Utc::now() + self.state_ttl;
        self.states.issue(&nonce, user_id, expires_at).await?;

        debug!(
            subsystem = "calendar",
            component = "token_coordinator",
            op = "begin_authorization",
            user_id,
            "Issued OAuth state"
        );
        self.get_auth_url(&nonce)
    }

    /// Handle the OAuth callback. The state is checked before the provider is
    /// contacted; an unknown or expired state never reaches `exchange`.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<UserId> {
        let user_id = self
            .states
            .consume(state)
            .await?
            .ok_or(Error::InvalidOAuthState)?;

        let token = self.exchange(code).await?;
        self.store(user_id, &token).await?;

        info!(
            subsystem = "calendar",
            component = "token_coordinator",
            op = "complete_authorization",
            user_id,
            "Calendar connected"
        );
        Ok(user_id)
    }

    /// One-shot code exchange. Not retried.
    pub async fn exchange(&self, code: &str) -> Result<CalendarToken> {
        if code.trim().is_empty() {
            return Err(Error::Exchange("authorization code is empty".to_string()));
        }
        self.provider.exchange_code(code).await
    }

    /// Insert or overwrite the user's token.
    pub async fn store(&self, user_id: UserId, token: &CalendarToken) -> Result<()> {
        self.tokens.store(user_id, token).await
    }

    pub async fn load(&self, user_id: UserId) -> Result<CalendarToken> {
        self.tokens
            .load(user_id)
            .await?
            .ok_or(Error::NotConnected(user_id))
    }

    /// Return `token` if still valid, otherwise refresh, persist and return
    /// the new one. A failed refresh means the user has to reauthorize.
    pub async fn ensure_fresh(&self, token: CalendarToken, user_id: UserId) -> Result<CalendarToken> {
        if !token.is_expired_at(Utc::now()) {
            return Ok(token);
        }

        debug!(
            subsystem = "calendar",
            component = "token_coordinator",
            op = "ensure_fresh",
            user_id,
            "Token expired, refreshing"
        );

        let refreshed = match self.provider.refresh(&token).await {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    subsystem = "calendar",
                    component = "token_coordinator",
                    op = "ensure_fresh",
                    user_id,
                    error = %e,
                    "Token refresh failed, reauthorization required"
                );
                return Err(match e {
                    Error::Refresh(msg) => Error::Refresh(msg),
                    other => Error::Refresh(other.to_string()),
                });
            }
        };

        self.store(user_id, &refreshed).await?;
        Ok(refreshed)
    }

    /// Single remote insert. Not retried.
    pub async fn add_event(
        &self,
        token: &CalendarToken,
        event: &CalendarEventInput,
    ) -> Result<RemoteEventRef> {
        self.provider
            .insert_event(token, event)
            .await
            .map_err(|e| match e {
                Error::RemoteSync(msg) => Error::RemoteSync(msg),
                other => Error::RemoteSync(other.to_string()),
            })
    }

    /// Load, refresh if needed, then insert.
    pub async fn sync_event(
        &self,
        user_id: UserId,
        event: &CalendarEventInput,
    ) -> Result<RemoteEventRef> {
        let token = self.load(user_id).await?;
        let token = self.ensure_fresh(token, user_id).await?;
        let remote = self.add_event(&token, event).await?;

        info!(
            subsystem = "calendar",
            component = "token_coordinator",
            op = "sync_event",
            user_id,
            remote_event_id = %remote.id,
            "Event added to calendar"
        );
        Ok(remote)
    }

    /// Connected means a stored token that is valid or can be refreshed.
    pub async fn is_connected(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .tokens
            .load(user_id)
            .await?
            .is_some_and(|t| !t.is_expired_at(Utc::now()) || t.can_refresh()))
    }

    /// Forget the user's token.
    pub async fn disconnect(&self, user_id: UserId) -> Result<bool> {
        self.tokens.delete(user_id).await
    }
}

/// Random URL-safe nonce for the OAuth `state` parameter.
pub fn generate_state_nonce() -> String {
    let mut bytes = [0u8; defaults::OAUTH_STATE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
