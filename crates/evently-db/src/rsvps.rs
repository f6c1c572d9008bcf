//! RSVP store keyed by (event_id, user_id).

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;

use evently_core::{
    Error, EventId, Result, Rsvp, RsvpCount, RsvpRepository, RsvpStatus, RsvpWithUser, UserId,
};

/// PostgreSQL RSVP repository.
pub struct PgRsvpRepository {
    pool: Pool<Postgres>,
}

impl PgRsvpRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_status(raw: &str) -> Result<RsvpStatus> {
        raw.parse()
            .map_err(|e: String| Error::Internal(format!("Corrupt rsvps.status: {}", e)))
    }

    fn parse_row(row: &PgRow) -> Result<Rsvp> {
        let status: String = row.get("status");
        Ok(Rsvp {
            id: row.get("id"),
            event_id: row.get("event_id"),
            user_id: row.get("user_id"),
            status: Self::parse_status(&status)?,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl RsvpRepository for PgRsvpRepository {
    async fn get(&self, event_id: EventId, user_id: UserId) -> Result<Option<Rsvp>> {
        let row = sqlx::query(
            "SELECT id, event_id, user_id, status, created_at, updated_at
             FROM rsvps WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn upsert(
        &self,
        event_id: EventId,
        user_id: UserId,
        status: RsvpStatus,
    ) -> Result<Rsvp> {
        // Single statement: the unique constraint arbitrates concurrent writers.
        // clock_timestamp() is read after the row lock is taken, so updated_at
        // orders writers by commit.
        let row = sqlx::query(
            "INSERT INTO rsvps (event_id, user_id, status)
             VALUES ($1, $2, $3)
             ON CONFLICT (event_id, user_id)
             DO UPDATE SET status = EXCLUDED.status, updated_at = clock_timestamp()
             RETURNING id, event_id, user_id, status, created_at, updated_at",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::parse_row(&row)
    }

    async fn delete(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rsvps WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, event_id: EventId) -> Result<RsvpCount> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'going') AS going,
                COUNT(*) FILTER (WHERE status = 'maybe') AS maybe,
                COUNT(*) FILTER (WHERE status = 'not_going') AS not_going
             FROM rsvps WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(RsvpCount {
            going: row.get("going"),
            maybe: row.get("maybe"),
            not_going: row.get("not_going"),
        })
    }

    async fn list_for_event(&self, event_id: EventId) -> Result<Vec<RsvpWithUser>> {
        let rows = sqlx::query(
            "SELECT r.id, r.event_id, r.user_id, r.status, r.created_at, r.updated_at,
                    u.first_name, u.last_name, u.email
             FROM rsvps r
             JOIN users u ON u.id = r.user_id
             WHERE r.event_id = $1
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "rsvps",
            op = "list_for_event",
            event_id,
            result_count = rows.len(),
            "Loaded RSVPs"
        );

        rows.iter()
            .map(|row| {
                Ok(RsvpWithUser {
                    rsvp: Self::parse_row(row)?,
                    first_name: row.get("first_name"),
                    last_name: row.get("last_name"),
                    email: row.get("email"),
                })
            })
            .collect()
    }
}
