//! Bottle lifecycle operations that notify viewers
//!
//! Each operation persists first and broadcasts only once storage succeeded.

use std::sync::Arc;

use tracing::info;

use crate::{
    broadcaster::Broadcaster,
    errors::BottleDriftError,
    models::{Bottle, BottleId, BottleStatus, EventKind, Journey, NewBottle},
    store::BottleStore,
};

pub struct BottleService<S> {
    store: Arc<S>,
    broadcaster: Broadcaster,
}

impl<S: BottleStore> BottleService<S> {
    pub fn new(store: Arc<S>, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    pub async fn get_bottle(&self, id: BottleId) -> Result<Bottle, BottleDriftError> {
        self.store.get_bottle(id).await
    }

    /// A bottle with every event recorded for it, oldest first
    pub async fn get_journey(&self, id: BottleId) -> Result<Journey, BottleDriftError> {
        let bottle = self.store.get_bottle(id).await?;
        let events = self.store.list_events(id).await?;
        Ok(Journey { bottle, events })
    }

    /// Store a new bottle and announce its release at the start position
    pub async fn create_bottle(&self, new: &NewBottle) -> Result<Bottle, BottleDriftError> {
        let bottle = self.store.create_bottle(new).await?;
        self.store
            .record_event(bottle.id, EventKind::Released, new.start_lat, new.start_lng)
            .await?;

        info!("Bottle {} released by sender {}", bottle.id, bottle.sender_id);
        self.broadcaster.broadcast_released(bottle.id);
        Ok(bottle)
    }

    /// Mark a bottle found by `discoverer_id` at (`lat`, `lng`)
    pub async fn discover_bottle(
        &self,
        id: BottleId,
        discoverer_id: i32,
        lat: f64,
        lng: f64,
    ) -> Result<Bottle, BottleDriftError> {
        let bottle = self.store.get_bottle(id).await?;

        if bottle.sender_id == discoverer_id {
            return Err(BottleDriftError::SenderCannotDiscover(id));
        }
        if bottle.status == BottleStatus::Discovered {
            return Err(BottleDriftError::AlreadyDiscovered(id));
        }

        self.store
            .record_event(id, EventKind::Discovered, lat, lng)
            .await?;
        let updated = self
            .store
            .update_status(id, BottleStatus::Discovered)
            .await?;

        info!("Bottle {} discovered by user {}", id, discoverer_id);
        self.broadcaster.broadcast_discovered(id);
        Ok(updated)
    }

    /// Put a bottle back into the sea at (`lat`, `lng`)
    pub async fn release_bottle(
        &self,
        id: BottleId,
        lat: f64,
        lng: f64,
    ) -> Result<Bottle, BottleDriftError> {
        let bottle = self.store.get_bottle(id).await?;

        self.store
            .record_event(bottle.id, EventKind::ReReleased, lat, lng)
            .await?;
        let updated = self
            .store
            .update_position(bottle.id, lat, lng, BottleStatus::Drifting)
            .await?;

        info!("Bottle {} re-released at ({:.4}, {:.4})", id, lat, lng);
        self.broadcaster.broadcast_released(updated.id);
        Ok(updated)
    }
}
