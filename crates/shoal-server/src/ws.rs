use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use shoal_core::net::messages::ClientEvent;
use shoal_core::net::protocol::{MAX_MESSAGE_SIZE, WireFormat, decode_client_event};

use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
        .into_response()
}

/// Split a frame into its wire format and payload. Control frames yield `None`.
fn frame_payload(msg: &Message) -> Option<(WireFormat, &[u8])> {
    match msg {
        Message::Text(text) => Some((WireFormat::Json, text.as_str().as_bytes())),
        Message::Binary(data) => Some((WireFormat::MsgPack, data.as_ref())),
        _ => None,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    // Wait for the first data frame: must be a playerJoin.
    let (format, join) = loop {
        let msg = match ws_receiver.next().await {
            Some(Ok(msg)) => msg,
            _ => return,
        };
        if matches!(msg, Message::Close(_)) {
            return;
        }
        let Some((format, data)) = frame_payload(&msg) else {
            continue;
        };
        match decode_client_event(format, data) {
            Ok(ClientEvent::PlayerJoin(join)) => break (format, join),
            Ok(other) => {
                tracing::debug!(event = other.name(), "First event was not playerJoin");
                return;
            },
            Err(e) => {
                tracing::debug!(error = %e, "Failed to decode join");
                return;
            },
        }
    };

    let connection_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<Message>(state.config.limits.player_message_buffer);
    state
        .hub
        .write()
        .await
        .join(&connection_id, join, tx, format);

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, &connection_id).await;

    // Disconnect: leave drops the hub's sender, which ends the writer task.
    state.hub.write().await.leave(&connection_id);
    tracing::info!(connection_id = %connection_id, "Connection closed");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(frame).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    connection_id: &str,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if matches!(msg, Message::Close(_)) {
            break;
        }
        let Some((format, data)) = frame_payload(&msg) else {
            continue;
        };

        if !rate_limiter.allow() {
            tracing::warn!(connection_id, "Rate limited");
            continue;
        }

        if data.len() > MAX_MESSAGE_SIZE {
            tracing::warn!(connection_id, size = data.len(), "Oversized frame dropped");
            continue;
        }

        let event = match decode_client_event(format, data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(connection_id, error = %e, "Undecodable frame dropped");
                continue;
            },
        };

        let mut hub = state.hub.write().await;
        match event {
            ClientEvent::PlayerJoin(_) => {
                tracing::debug!(connection_id, "Duplicate playerJoin ignored");
            },
            ClientEvent::PlayerUpdate(update) => hub.update(connection_id, &update),
            ClientEvent::FoodEaten(food_id) => hub.food_eaten(connection_id, &food_id),
            ClientEvent::PlayerEaten(victim) => hub.player_eaten(connection_id, &victim),
            ClientEvent::PlayerRespawn(respawn) => hub.respawn(connection_id, &respawn),
        }
    }
}
