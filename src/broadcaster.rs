//! Typed broadcasts on top of the hub
//!
//! Every message viewers receive is a JSON envelope `{"type", "payload"}`;
//! the `type` tag tells the client how to read the payload.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    hub::Hub,
    models::{Bottle, BottleId, DriftEvent},
};

/// Envelope tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    #[serde(rename = "bottle_drift")]
    Drift,
    #[serde(rename = "bottle_discovered")]
    Discovered,
    #[serde(rename = "bottle_released")]
    Released,
}

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: MessageKind,
    payload: &'a T,
}

/// Position update consumed by viewers to move a bottle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftPayload {
    pub bottle_id: BottleId,
    pub lat: f64,
    pub lng: f64,
    pub hops: i32,
    pub bottle_style: i32,
    /// Serialized as RFC 3339
    pub timestamp: DateTime<Utc>,
}

impl DriftPayload {
    /// Combine a drift event with the stored bottle it was applied to
    pub fn new(event: &DriftEvent, bottle: &Bottle) -> Self {
        Self {
            bottle_id: event.bottle_id,
            lat: event.lat,
            lng: event.lng,
            hops: bottle.hops,
            bottle_style: bottle.bottle_style,
            timestamp: event.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BottleRef {
    pub bottle_id: BottleId,
}

/// Encode a message envelope
pub fn encode<T: Serialize>(kind: MessageKind, payload: &T) -> Result<Bytes, serde_json::Error> {
    let data = serde_json::to_vec(&Envelope { kind, payload })?;
    Ok(Bytes::from(data))
}

/// Domain-level broadcaster. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    hub: Arc<Hub>,
}

impl Broadcaster {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn broadcast_drift(&self, payload: &DriftPayload) {
        self.broadcast(MessageKind::Drift, payload);
    }

    pub fn broadcast_discovered(&self, bottle_id: BottleId) {
        self.broadcast(MessageKind::Discovered, &BottleRef { bottle_id });
    }

    pub fn broadcast_released(&self, bottle_id: BottleId) {
        self.broadcast(MessageKind::Released, &BottleRef { bottle_id });
    }

    /// Best effort: an encoding failure is logged and the message dropped.
    fn broadcast<T: Serialize>(&self, kind: MessageKind, payload: &T) {
        match encode(kind, payload) {
            Ok(data) => {
                let delivered = self.hub.broadcast(data);
                debug!("Broadcast {:?} to {} subscribers", kind, delivered);
            }
            Err(e) => {
                error!("Failed to encode {:?} broadcast: {}", kind, e);
            }
        }
    }
}
