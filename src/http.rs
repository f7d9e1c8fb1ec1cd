//! HTTP surface: the viewer WebSocket endpoint and a health probe

use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    config::WebSocketConfig,
    hub::Hub,
    ws::{serve_socket, SessionSettings},
};

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    subscribers: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(drift_socket))
        .with_state(state)
}

// GET /health
async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        subscribers: state.hub.count(),
    })
}

// GET /ws, rejected by the extractor unless it is a WebSocket upgrade
async fn drift_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let settings = SessionSettings::from(&state.websocket);
    let hub = state.hub.clone();
    ws.max_message_size(state.websocket.max_message_size)
        .on_upgrade(move |socket| serve_socket(socket, hub, settings))
}
