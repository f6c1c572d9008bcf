//! # evently-db
//!
//! PostgreSQL database layer for evently.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for events, users, RSVPs and calendar tokens
//! - Schema migrations (feature `migrations`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use evently_db::{Database, RsvpRepository, RsvpStatus};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/evently").await?;
//!     let rsvp = db.rsvps.upsert(1, 2, RsvpStatus::Going).await?;
//!     println!("RSVP {} is {}", rsvp.id, rsvp.status);
//!     Ok(())
//! }
//! ```

pub mod calendar_tokens;
pub mod events;
pub mod pool;
pub mod rsvps;

// Always compiled so integration tests (in tests/) can use the fixtures
pub mod test_fixtures;

// Re-export core types
pub use evently_core::*;

pub use calendar_tokens::{PgCalendarTokenRepository, PgOAuthStateRepository};
pub use events::{PgEventRepository, PgUserRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use rsvps::PgRsvpRepository;

use std::sync::Arc;

/// Combined database context with all repositories.
///
/// Repositories are reference counted so they can be handed to the
/// coordinators as trait objects.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub events: Arc<PgEventRepository>,
    pub users: Arc<PgUserRepository>,
    pub rsvps: Arc<PgRsvpRepository>,
    pub calendar_tokens: Arc<PgCalendarTokenRepository>,
    pub oauth_states: Arc<PgOAuthStateRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            events: Arc::new(PgEventRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            rsvps: Arc::new(PgRsvpRepository::new(pool.clone())),
            calendar_tokens: Arc::new(PgCalendarTokenRepository::new(pool.clone())),
            oauth_states: Arc::new(PgOAuthStateRepository::new(pool.clone())),
            pool,
        }
    }

    /// Connect to database with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Cheap liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
