//! Errors for the bottle drift service
use thiserror::Error;

use crate::models::BottleId;

#[derive(Error, Debug)]
pub enum BottleDriftError {
    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Bottle {0} not found")]
    BottleNotFound(BottleId),

    #[error("Invalid bottle status: {0}")]
    InvalidStatus(String),

    #[error("Invalid event kind: {0}")]
    InvalidEventKind(String),

    #[error("Bottle {0} has already been discovered")]
    AlreadyDiscovered(BottleId),

    #[error("Sender cannot discover their own bottle {0}")]
    SenderCannotDiscover(BottleId),

    #[error("Drift scheduler is already running")]
    SchedulerAlreadyRunning,
}
