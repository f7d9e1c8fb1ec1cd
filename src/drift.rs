//! Drift engine: advances a single bottle by one simulation tick

use chrono::Utc;
use rand::Rng;
use tracing::debug;

use crate::{
    currents, geo,
    models::{Bottle, DriftEvent},
};

/// Simulated drift per tick, in hours
pub const DRIFT_TICK_HOURS: f64 = 0.25;

/// Maximum random bearing offset in degrees, applied in both directions
pub const BEARING_JITTER_DEG: f64 = 10.0;

/// Compute where `bottle` drifts to during one tick.
///
/// The bearing of the local current is jittered uniformly within
/// [-10°, +10°) so paths do not trace perfect geometric curves. The bottle
/// itself is not modified; persisting the move is up to the caller.
pub fn advance<R>(bottle: &Bottle, rng: &mut R) -> DriftEvent
where
    R: Rng + ?Sized,
{
    let zone = currents::resolve(bottle.current_lat, bottle.current_lng);

    let jitter = rng.random_range(-BEARING_JITTER_DEG..BEARING_JITTER_DEG);
    let bearing = (zone.bearing + jitter).rem_euclid(360.0);

    let (lat, lng) = geo::displace(
        bottle.current_lat,
        bottle.current_lng,
        zone.speed_kmh,
        bearing,
        DRIFT_TICK_HOURS,
    );

    debug!(
        "Bottle {} in {}: bearing {:.1}, ({:.5}, {:.5}) -> ({:.5}, {:.5})",
        bottle.id, zone.name, bearing, bottle.current_lat, bottle.current_lng, lat, lng
    );

    DriftEvent {
        bottle_id: bottle.id,
        lat,
        lng,
        timestamp: Utc::now(),
    }
}
