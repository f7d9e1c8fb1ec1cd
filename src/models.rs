//! Data models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::BottleDriftError;

/// Bottle identifier, as assigned by the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BottleId(i32);

impl From<i32> for BottleId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl BottleId {
    /// Get the raw identifier value
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for BottleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a bottle
///
/// Only `Drifting` bottles are advanced by the drift scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BottleStatus {
    #[default]
    Drifting,
    Discovered,
    Released,
}

impl BottleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BottleStatus::Drifting => "drifting",
            BottleStatus::Discovered => "discovered",
            BottleStatus::Released => "released",
        }
    }
}

impl FromStr for BottleStatus {
    type Err = BottleDriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drifting" => Ok(BottleStatus::Drifting),
            "discovered" => Ok(BottleStatus::Discovered),
            "released" => Ok(BottleStatus::Released),
            other => Err(BottleDriftError::InvalidStatus(other.to_string())),
        }
    }
}

/// A message bottle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottle {
    pub id: BottleId,
    pub sender_id: i32,
    pub message_text: String,
    /// Visual style index, passed through to viewers
    pub bottle_style: i32,
    pub start_lat: f64,
    pub start_lng: f64,
    /// Latitude in decimal degrees, within [-90, 90]
    pub current_lat: f64,
    /// Longitude in decimal degrees, within [-180, 180]
    pub current_lng: f64,
    /// Number of recorded position changes
    pub hops: i32,
    pub scheduled_release: DateTime<Utc>,
    pub status: BottleStatus,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new bottle
#[derive(Debug, Clone, PartialEq)]
pub struct NewBottle {
    pub sender_id: i32,
    pub message_text: String,
    pub bottle_style: i32,
    pub start_lat: f64,
    pub start_lng: f64,
    /// Release time, `None` releases immediately
    pub release_at: Option<DateTime<Utc>>,
}

/// Kind of a persisted bottle event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Released,
    Drift,
    Discovered,
    ReReleased,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Released => "released",
            EventKind::Drift => "drift",
            EventKind::Discovered => "discovered",
            EventKind::ReReleased => "re_released",
        }
    }
}

impl FromStr for EventKind {
    type Err = BottleDriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "released" => Ok(EventKind::Released),
            "drift" => Ok(EventKind::Drift),
            "discovered" => Ok(EventKind::Discovered),
            "re_released" => Ok(EventKind::ReReleased),
            other => Err(BottleDriftError::InvalidEventKind(other.to_string())),
        }
    }
}

/// Persisted event in a bottle's journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleEvent {
    pub id: i32,
    pub bottle_id: BottleId,
    pub kind: EventKind,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
}

/// A bottle together with its events, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub bottle: Bottle,
    pub events: Vec<BottleEvent>,
}

/// Result of advancing one bottle by one drift tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftEvent {
    pub bottle_id: BottleId,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            BottleStatus::Drifting,
            BottleStatus::Discovered,
            BottleStatus::Released,
        ] {
            assert_eq!(status.as_str().parse::<BottleStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "sunk".parse::<BottleStatus>().unwrap_err();
        assert!(matches!(err, BottleDriftError::InvalidStatus(s) if s == "sunk"));
    }

    #[test]
    fn event_kind_uses_snake_case() {
        assert_eq!(EventKind::ReReleased.as_str(), "re_released");
        assert_eq!(
            serde_json::to_string(&EventKind::ReReleased).unwrap(),
            "\"re_released\""
        );
        assert_eq!("drift".parse::<EventKind>().unwrap(), EventKind::Drift);
    }

    #[test]
    fn bottle_id_serializes_as_number() {
        let id = BottleId::from(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
    }
}
