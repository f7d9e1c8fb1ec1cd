//! WebSocket session for one live viewer
//!
//! A session registers with the hub and runs two halves:
//! - the writer drains the subscriber queue and pings on an interval,
//! - the reader discards inbound frames and watches for pongs.
//!
//! When either half ends the other is aborted and the subscriber leaves the
//! hub.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::{
    config::WebSocketConfig,
    hub::{Hub, SubscriberId, Subscription},
};

/// Liveness timing for a session
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub write_timeout: Duration,
}

impl From<&WebSocketConfig> for SessionSettings {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            ping_interval: config.ping_interval,
            pong_timeout: config.pong_timeout,
            write_timeout: config.write_timeout,
        }
    }
}

/// Serve an upgraded socket until it closes or falls behind
pub async fn serve_socket(socket: WebSocket, hub: Arc<Hub>, settings: SessionSettings) {
    let (sink, stream) = socket.split();
    run_session(sink, stream, hub, settings).await;
}

/// Run a session over any message sink/stream pair
pub async fn run_session<Si, St, E>(sink: Si, stream: St, hub: Arc<Hub>, settings: SessionSettings)
where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: Display,
    St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: Display + Send + 'static,
{
    let Subscription { id, rx } = hub.register();

    let mut writer = tokio::spawn(write_loop(sink, rx, settings, id));
    let mut reader = tokio::spawn(read_loop(stream, settings.pong_timeout, id));

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    hub.unregister(id);
    info!("Subscriber {} disconnected", id);
}

async fn write_loop<Si>(
    mut sink: Si,
    mut rx: mpsc::Receiver<Bytes>,
    settings: SessionSettings,
    id: SubscriberId,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    let mut ping = time::interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );

    loop {
        let frame = tokio::select! {
            message = rx.recv() => match message {
                Some(payload) => frame_for(payload),
                None => {
                    // Hub dropped this subscriber
                    let _ = time::timeout(settings.write_timeout, sink.send(Message::Close(None))).await;
                    return;
                }
            },
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        match time::timeout(settings.write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("Write to subscriber {} failed: {}", id, e);
                return;
            }
            Err(_) => {
                warn!(
                    "Write to subscriber {} timed out after {:?}",
                    id, settings.write_timeout
                );
                return;
            }
        }
    }
}

async fn read_loop<St, E>(mut stream: St, pong_timeout: Duration, id: SubscriberId)
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut deadline = Instant::now() + pong_timeout;

    loop {
        match time::timeout_at(deadline, stream.next()).await {
            Err(_) => {
                info!("Subscriber {} sent no pong within {:?}", id, pong_timeout);
                return;
            }
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return,
            Ok(Some(Err(e))) => {
                debug!("Read from subscriber {} failed: {}", id, e);
                return;
            }
            Ok(Some(Ok(Message::Pong(_)))) => deadline = Instant::now() + pong_timeout,
            // Viewers have nothing to say
            Ok(Some(Ok(_))) => {}
        }
    }
}

/// JSON envelopes go out as text frames, anything else as binary
fn frame_for(payload: Bytes) -> Message {
    // Bytes clones share the buffer
    match Utf8Bytes::try_from(payload.clone()) {
        Ok(text) => Message::Text(text),
        Err(_) => Message::Binary(payload),
    }
}
