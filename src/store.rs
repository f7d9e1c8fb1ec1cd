//! Persistence boundary used by the scheduler and the bottle service

use std::future::Future;

use crate::{
    errors::BottleDriftError,
    models::{Bottle, BottleEvent, BottleId, BottleStatus, EventKind, NewBottle},
};

/// Storage of bottles and their journey events
///
/// The system of record for bottle state; everything the simulation holds
/// in memory is a transient copy.
pub trait BottleStore: Send + Sync + 'static {
    /// Bottles that are drifting and whose scheduled release has passed
    fn list_eligible_for_drift(
        &self,
    ) -> impl Future<Output = Result<Vec<Bottle>, BottleDriftError>> + Send;

    fn get_bottle(
        &self,
        id: BottleId,
    ) -> impl Future<Output = Result<Bottle, BottleDriftError>> + Send;

    fn create_bottle(
        &self,
        bottle: &NewBottle,
    ) -> impl Future<Output = Result<Bottle, BottleDriftError>> + Send;

    /// Append an event to a bottle's journey
    fn record_event(
        &self,
        id: BottleId,
        kind: EventKind,
        lat: f64,
        lng: f64,
    ) -> impl Future<Output = Result<BottleEvent, BottleDriftError>> + Send;

    /// Events of one bottle, oldest first
    fn list_events(
        &self,
        id: BottleId,
    ) -> impl Future<Output = Result<Vec<BottleEvent>, BottleDriftError>> + Send;

    fn record_drift_event(
        &self,
        id: BottleId,
        lat: f64,
        lng: f64,
    ) -> impl Future<Output = Result<BottleEvent, BottleDriftError>> + Send {
        self.record_event(id, EventKind::Drift, lat, lng)
    }

    /// Move a bottle, set its status and count the hop
    fn update_position(
        &self,
        id: BottleId,
        lat: f64,
        lng: f64,
        status: BottleStatus,
    ) -> impl Future<Output = Result<Bottle, BottleDriftError>> + Send;

    fn update_status(
        &self,
        id: BottleId,
        status: BottleStatus,
    ) -> impl Future<Output = Result<Bottle, BottleDriftError>> + Send;
}
