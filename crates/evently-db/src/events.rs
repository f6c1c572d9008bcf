//! Event and user context reads.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use evently_core::{Error, Event, EventId, EventRepository, Result, User, UserId, UserRepository};

/// PostgreSQL event repository.
pub struct PgEventRepository {
    pool: Pool<Postgres>,
}

impl PgEventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::postgres::PgRow) -> Event {
        Event {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            date: row.get("date"),
            location: row.get("location"),
            user_id: row.get("user_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            organizer_first_name: row.get("organizer_first_name"),
            organizer_last_name: row.get("organizer_last_name"),
            organizer_email: row.get("organizer_email"),
        }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn get(&self, event_id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query(
            "SELECT e.id, e.title, e.description, e.date, e.location, e.user_id,
                    e.created_at, e.updated_at,
                    u.first_name AS organizer_first_name,
                    u.last_name AS organizer_last_name,
                    u.email AS organizer_email
             FROM events e
             LEFT JOIN users u ON u.id = e.user_id
             WHERE e.id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(Self::parse_row))
    }
}

/// PostgreSQL user repository.
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, email, first_name, last_name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(|r| User {
            id: r.get("id"),
            email: r.get("email"),
            first_name: r.get("first_name"),
            last_name: r.get("last_name"),
        }))
    }
}
