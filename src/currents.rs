//! Ocean current model
//!
//! A coarse gyre model: the ocean is split into rectangular zones, each with
//! one dominant current. Zones are checked in order and the first match
//! wins; the final zone spans the whole globe so every position resolves.

/// A geographic rectangle with a prevailing current
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentZone {
    pub name: &'static str,
    pub min_lat: f64,
    pub max_lat: f64,
    /// Western bound. Greater than `max_lng` when the zone wraps across the
    /// antimeridian.
    pub min_lng: f64,
    pub max_lng: f64,
    /// Degrees, 0 = north, clockwise
    pub bearing: f64,
    pub speed_kmh: f64,
}

impl CurrentZone {
    /// Inclusive membership test, honouring antimeridian wrap
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        let lat_in = lat >= self.min_lat && lat <= self.max_lat;
        let lng_in = if self.min_lng <= self.max_lng {
            lng >= self.min_lng && lng <= self.max_lng
        } else {
            lng >= self.min_lng || lng <= self.max_lng
        };
        lat_in && lng_in
    }

    pub fn wraps_antimeridian(&self) -> bool {
        self.min_lng > self.max_lng
    }
}

pub const GLOBAL_DRIFT: CurrentZone = CurrentZone {
    name: "global drift",
    min_lat: -90.0,
    max_lat: 90.0,
    min_lng: -180.0,
    max_lng: 180.0,
    bearing: 0.0,
    speed_kmh: 0.5,
};

/// Ordered zone table. The equatorial band is left to the global fallback.
pub static OCEAN_ZONES: [CurrentZone; 6] = [
    CurrentZone {
        name: "north atlantic gyre",
        min_lat: 5.0,
        max_lat: 60.0,
        min_lng: -80.0,
        max_lng: 0.0,
        bearing: 45.0,
        speed_kmh: 2.5,
    },
    CurrentZone {
        name: "south atlantic gyre",
        min_lat: -60.0,
        max_lat: -5.0,
        min_lng: -60.0,
        max_lng: 20.0,
        bearing: 225.0,
        speed_kmh: 2.0,
    },
    CurrentZone {
        name: "north pacific gyre",
        min_lat: 0.0,
        max_lat: 65.0,
        min_lng: 120.0,
        max_lng: -120.0,
        bearing: 60.0,
        speed_kmh: 2.8,
    },
    CurrentZone {
        name: "south pacific gyre",
        min_lat: -60.0,
        max_lat: 0.0,
        min_lng: 150.0,
        max_lng: -70.0,
        bearing: 210.0,
        speed_kmh: 2.2,
    },
    CurrentZone {
        name: "indian ocean gyre",
        min_lat: -60.0,
        max_lat: 25.0,
        min_lng: 40.0,
        max_lng: 120.0,
        bearing: 270.0,
        speed_kmh: 1.8,
    },
    GLOBAL_DRIFT,
];

/// Dominant current zone at a position. Never fails: anything outside the
/// named gyres, including NaN coordinates, gets the global fallback.
pub fn resolve(lat: f64, lng: f64) -> &'static CurrentZone {
    OCEAN_ZONES
        .iter()
        .find(|zone| zone.contains(lat, lng))
        .unwrap_or(&OCEAN_ZONES[OCEAN_ZONES.len() - 1])
}
