//! Message bottles drifting on a simulated ocean, streamed live to viewers.

pub mod broadcaster;
pub mod config;
pub mod currents;
pub mod database;
pub mod drift;
pub mod errors;
pub mod geo;
pub mod http;
pub mod hub;
pub mod models;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod ws;
