use super::{
    models::{Event, EventUpdate, NewEvent, NewPrincipal, Principal},
    CredentialStore, EventStore, StoreError,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::{Connection, PgPool};
use tracing::{error, info_span, instrument, Instrument};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Apply `sql/schema.sql`; every statement is idempotent.
///
/// # Errors
/// Returns an error if any statement fails.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

async fn ping(pool: &PgPool) -> Result<(), StoreError> {
    let acquire_span = info_span!(
        "db.acquire",
        db.system = "postgresql",
        db.operation = "ACQUIRE"
    );
    let mut conn = pool.acquire().instrument(acquire_span).await?;
    let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
    conn.ping().instrument(ping_span).await?;
    Ok(())
}

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Principal, StoreError> {
        let query = "SELECT * FROM principals WHERE username = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, Principal>(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Principal, StoreError> {
        let query = "SELECT * FROM principals WHERE id = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        sqlx::query_as::<_, Principal>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?
            .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self, principal), fields(username = %principal.username))]
    async fn create(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        // The unique index on username makes this insert the atomic check.
        let query = r"
            INSERT INTO principals (id, username, password, role, totp_secret)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query_as::<_, Principal>(query)
            .bind(Uuid::new_v4())
            .bind(&principal.username)
            .bind(principal.password.expose_secret())
            .bind(principal.role.as_str())
            .bind(&principal.totp_secret)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|e| {
                let err = StoreError::from(e);
                if let StoreError::Unavailable(reason) = &err {
                    error!("Error inserting principal: {reason}");
                }
                err
            })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        ping(&self.pool).await
    }
}

#[derive(Clone, Debug)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, event), fields(title = %event.title))]
    async fn create(&self, event: NewEvent) -> Result<Event, StoreError> {
        let query = r"
            INSERT INTO events (id, title, description, date, location, capacity, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query_as::<_, Event>(query)
            .bind(Uuid::new_v4())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.date)
            .bind(&event.location)
            .bind(event.capacity)
            .bind(event.status.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Event>, StoreError> {
        let query = "SELECT * FROM events ORDER BY date ASC";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query_as::<_, Event>(query)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, id: Uuid, update: EventUpdate) -> Result<Event, StoreError> {
        let query = r"
            UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                date = COALESCE($4, date),
                location = COALESCE($5, location),
                capacity = COALESCE($6, capacity),
                status = COALESCE($7, status)
            WHERE id = $1
            RETURNING *
            ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query_as::<_, Event>(query)
            .bind(id)
            .bind(update.title)
            .bind(update.description)
            .bind(update.date)
            .bind(update.location)
            .bind(update.capacity)
            .bind(update.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        ping(&self.pool).await
    }
}
