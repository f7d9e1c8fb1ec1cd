// src/database.rs
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{error, info};

use crate::{
    config::DatabaseConfig,
    errors::BottleDriftError,
    models::{Bottle, BottleEvent, BottleId, BottleStatus, EventKind, NewBottle},
    store::BottleStore,
};

mod models;

use models::{BottleRow, EventRow};

const BOTTLE_COLUMNS: &str = "id, sender_id, message_text, bottle_style, start_lat, start_lng, \
     current_lat, current_lng, hops, scheduled_release, status, created_at";

const EVENT_COLUMNS: &str = "id, bottle_id, event_type, lat, lng, created_at";

/// PostgreSQL-backed bottle store
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Wrap an existing pool and bring the schema up to date
    pub async fn new(pool: PgPool) -> Result<Self, BottleDriftError> {
        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            error!("Failed to run database migrations: {}", e);
            return Err(e.into());
        }
        Ok(Self { pool })
    }

    /// Connect using application configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, BottleDriftError> {
        config.validate()?;

        info!(
            "Connecting to database, max_connections={}",
            config.max_connections
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        Self::new(pool).await
    }
}

impl BottleStore for Database {
    async fn list_eligible_for_drift(&self) -> Result<Vec<Bottle>, BottleDriftError> {
        let rows: Vec<BottleRow> = sqlx::query_as(&format!(
            "SELECT {BOTTLE_COLUMNS} FROM bottles
             WHERE status = $1 AND scheduled_release <= now()
             ORDER BY id"
        ))
        .bind(BottleStatus::Drifting.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bottle::try_from).collect()
    }

    async fn get_bottle(&self, id: BottleId) -> Result<Bottle, BottleDriftError> {
        let row: Option<BottleRow> =
            sqlx::query_as(&format!("SELECT {BOTTLE_COLUMNS} FROM bottles WHERE id = $1"))
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await?;

        row.ok_or(BottleDriftError::BottleNotFound(id))?.try_into()
    }

    async fn create_bottle(&self, bottle: &NewBottle) -> Result<Bottle, BottleDriftError> {
        let row: BottleRow = sqlx::query_as(&format!(
            "INSERT INTO bottles (
                sender_id, message_text, bottle_style, start_lat, start_lng,
                current_lat, current_lng, scheduled_release, status
            ) VALUES ($1, $2, $3, $4, $5, $4, $5, COALESCE($6, now()), $7)
            RETURNING {BOTTLE_COLUMNS}"
        ))
        .bind(bottle.sender_id)
        .bind(&bottle.message_text)
        .bind(bottle.bottle_style)
        .bind(bottle.start_lat)
        .bind(bottle.start_lng)
        .bind(bottle.release_at)
        .bind(BottleStatus::Drifting.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn record_event(
        &self,
        id: BottleId,
        kind: EventKind,
        lat: f64,
        lng: f64,
    ) -> Result<BottleEvent, BottleDriftError> {
        let row: EventRow = sqlx::query_as(&format!(
            "INSERT INTO bottle_events (bottle_id, event_type, lat, lng)
             VALUES ($1, $2, $3, $4)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id.value())
        .bind(kind.as_str())
        .bind(lat)
        .bind(lng)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list_events(&self, id: BottleId) -> Result<Vec<BottleEvent>, BottleDriftError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM bottle_events WHERE bottle_id = $1 ORDER BY id"
        ))
        .bind(id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BottleEvent::try_from).collect()
    }

    async fn update_position(
        &self,
        id: BottleId,
        lat: f64,
        lng: f64,
        status: BottleStatus,
    ) -> Result<Bottle, BottleDriftError> {
        let row: Option<BottleRow> = sqlx::query_as(&format!(
            "UPDATE bottles
             SET current_lat = $2, current_lng = $3, hops = hops + 1, status = $4
             WHERE id = $1
             RETURNING {BOTTLE_COLUMNS}"
        ))
        .bind(id.value())
        .bind(lat)
        .bind(lng)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(BottleDriftError::BottleNotFound(id))?.try_into()
    }

    async fn update_status(
        &self,
        id: BottleId,
        status: BottleStatus,
    ) -> Result<Bottle, BottleDriftError> {
        let row: Option<BottleRow> = sqlx::query_as(&format!(
            "UPDATE bottles SET status = $2 WHERE id = $1 RETURNING {BOTTLE_COLUMNS}"
        ))
        .bind(id.value())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(BottleDriftError::BottleNotFound(id))?.try_into()
    }
}
