//! Persistence seams used by the services.
//!
//! The credential store only enforces username uniqueness; everything else
//! (secret generation, password handling) belongs to the registration flow.
//! Event persistence is a plain collaborator behind the same pattern.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::{MemoryCredentialStore, MemoryEventStore};
pub use models::{Event, EventStatus, EventUpdate, NewEvent, NewPrincipal, Principal, Role};
pub use postgres::{PgCredentialStore, PgEventStore};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tracing::info;
use uuid::Uuid;

/// DSN that selects the in-process stores instead of Postgres.
pub const MEMORY_DSN: &str = "memory://";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            other => Self::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a principal by its unique username.
    async fn find_by_username(&self, username: &str) -> Result<Principal, StoreError>;

    /// Look up a principal by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Principal, StoreError>;

    /// Insert a principal; fails with [`StoreError::Conflict`] if the username is taken.
    /// The check and the insert are a single atomic step.
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, StoreError>;

    /// Liveness probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, event: NewEvent) -> Result<Event, StoreError>;

    async fn list(&self) -> Result<Vec<Event>, StoreError>;

    async fn update(&self, id: Uuid, update: EventUpdate) -> Result<Event, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Storage backend selected from the `--dsn` argument.
#[derive(Clone, Debug)]
pub enum Backend {
    Postgres(PgPool),
    Memory,
}

impl Backend {
    /// Connect to Postgres (and apply the schema) or select the in-memory backend.
    ///
    /// # Errors
    /// Returns an error if the database is unreachable or the schema cannot be applied.
    pub async fn connect(dsn: &str) -> Result<Self> {
        if dsn == MEMORY_DSN {
            info!("Using in-memory stores; records are lost on restart");
            return Ok(Self::Memory);
        }

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        postgres::apply_schema(&pool)
            .await
            .context("Failed to apply database schema")?;

        Ok(Self::Postgres(pool))
    }

    #[must_use]
    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        match self {
            Self::Postgres(pool) => Arc::new(PgCredentialStore::new(pool.clone())),
            Self::Memory => Arc::new(MemoryCredentialStore::default()),
        }
    }

    #[must_use]
    pub fn events(&self) -> Arc<dyn EventStore> {
        match self {
            Self::Postgres(pool) => Arc::new(PgEventStore::new(pool.clone())),
            Self::Memory => Arc::new(MemoryEventStore::default()),
        }
    }
}
