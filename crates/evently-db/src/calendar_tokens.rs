//! Calendar OAuth token and state nonce storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use evently_core::{
    CalendarToken, CalendarTokenRepository, Error, OAuthStateRepository, Result, UserId,
};

/// PostgreSQL calendar token repository.
///
/// The token is stored as JSON in `calendar_tokens.token_data`, one row per user.
pub struct PgCalendarTokenRepository {
    pool: Pool<Postgres>,
}

impl PgCalendarTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CalendarTokenRepository for PgCalendarTokenRepository {
    async fn store(&self, user_id: UserId, token: &CalendarToken) -> Result<()> {
        let token_data = serde_json::to_string(token)?;
        sqlx::query(
            "INSERT INTO calendar_tokens (user_id, token_data)
             VALUES ($1, $2)
             ON CONFLICT (user_id)
             DO UPDATE SET token_data = EXCLUDED.token_data, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(token_data)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn load(&self, user_id: UserId) -> Result<Option<CalendarToken>> {
        let row = sqlx::query("SELECT token_data FROM calendar_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match row {
            Some(row) => {
                let token_data: String = row.get("token_data");
                Ok(Some(serde_json::from_str(&token_data)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM calendar_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL store for OAuth authorize-flow state nonces.
pub struct PgOAuthStateRepository {
    pool: Pool<Postgres>,
}

impl PgOAuthStateRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Remove nonces past their expiry. Returns the number deleted.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM calendar_oauth_states WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OAuthStateRepository for PgOAuthStateRepository {
    async fn issue(&self, nonce: &str, user_id: UserId, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO calendar_oauth_states (nonce, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(nonce)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn consume(&self, nonce: &str) -> Result<Option<UserId>> {
        let row = sqlx::query(
            "DELETE FROM calendar_oauth_states
             WHERE nonce = $1 AND expires_at > NOW()
             RETURNING user_id",
        )
        .bind(nonce)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| r.get("user_id")))
    }
}
