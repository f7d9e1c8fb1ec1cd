//! Bottle drift server

use std::sync::Arc;

use bottle_drift::{
    broadcaster::Broadcaster,
    config::AppConfig,
    database::Database,
    errors::BottleDriftError,
    http::{build_router, AppState},
    hub::Hub,
    scheduler::{DriftTicker, Scheduler},
};
use rand::{rngs::StdRng, SeedableRng};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BottleDriftError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let database = Arc::new(Database::connect(&config.database).await?);

    let hub = Arc::new(Hub::new(config.websocket.queue_capacity));
    let broadcaster = Broadcaster::new(hub.clone());

    let ticker = DriftTicker::new(
        database,
        broadcaster,
        Box::new(StdRng::from_os_rng()),
    );
    let mut scheduler = Scheduler::new(ticker, config.drift.tick_interval);
    // Without a running scheduler nothing drifts
    scheduler.start()?;

    let app = build_router(AppState {
        hub,
        websocket: config.websocket.clone(),
    });

    let listener = TcpListener::bind(config.server.bind_addr).await?;
    info!("Listening on {}", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
            }
        })
        .await?;

    scheduler.stop().await;

    Ok(())
}
