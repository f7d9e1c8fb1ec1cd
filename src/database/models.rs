// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::{
    errors::BottleDriftError,
    models::{Bottle, BottleEvent, BottleId},
};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BottleRow {
    id: i32,
    sender_id: i32,
    message_text: String,
    bottle_style: i32,
    start_lat: f64,
    start_lng: f64,
    current_lat: Option<f64>, // NULL until the first move
    current_lng: Option<f64>,
    hops: i32,
    scheduled_release: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BottleRow> for Bottle {
    type Error = BottleDriftError;

    fn try_from(row: BottleRow) -> Result<Self, Self::Error> {
        Ok(Bottle {
            id: BottleId::from(row.id),
            sender_id: row.sender_id,
            message_text: row.message_text,
            bottle_style: row.bottle_style,
            start_lat: row.start_lat,
            start_lng: row.start_lng,
            current_lat: row.current_lat.unwrap_or(row.start_lat),
            current_lng: row.current_lng.unwrap_or(row.start_lng),
            hops: row.hops,
            scheduled_release: row.scheduled_release,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    id: i32,
    bottle_id: i32,
    event_type: String,
    lat: f64,
    lng: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for BottleEvent {
    type Error = BottleDriftError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(BottleEvent {
            id: row.id,
            bottle_id: BottleId::from(row.bottle_id),
            kind: row.event_type.parse()?,
            lat: row.lat,
            lng: row.lng,
            created_at: row.created_at,
        })
    }
}
