use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use shoal_core::net::messages::{ClientEvent, GameStatePayload, ServerEvent};
use shoal_core::net::protocol::{
    WireFormat, decode_server_event, encode_client_event, encode_client_text,
};
use shoal_core::test_helpers::make_join;

use shoal_server::build_app;
use shoal_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Default config, but spawn timers slow enough to stay out of the way.
    pub async fn new() -> Self {
        let mut config = ServerConfig::default();
        config.food.initial_food = 5;
        config.food.solo_spawn_period_ms = 60_000;
        config.food.crowd_spawn_period_ms = 60_000;
        Self::from_config(config).await
    }

    /// Fast spawn timers with an empty field.
    pub async fn with_fast_spawns(solo_ms: u64, crowd_ms: u64) -> Self {
        let mut config = ServerConfig::default();
        config.food.initial_food = 0;
        config.food.solo_spawn_period_ms = solo_ms;
        config.food.crowd_spawn_period_ms = crowd_ms;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a client event as a JSON text frame.
pub async fn ws_send_event(stream: &mut WsStream, event: &ClientEvent) {
    let text = encode_client_text(event).unwrap();
    stream.send(Message::Text(text.into())).await.unwrap();
}

/// Send a client event as a MessagePack binary frame.
pub async fn ws_send_event_msgpack(stream: &mut WsStream, event: &ClientEvent) {
    let data = encode_client_event(WireFormat::MsgPack, event).unwrap();
    stream.send(Message::Binary(data.into())).await.unwrap();
}

/// Join over JSON and return the initial game state.
pub async fn ws_join(stream: &mut WsStream, name: &str) -> GameStatePayload {
    ws_send_event(stream, &ClientEvent::PlayerJoin(make_join(name))).await;
    expect_game_state(ws_read_event(stream).await)
}

/// Join over MessagePack and return the initial game state.
pub async fn ws_join_msgpack(stream: &mut WsStream, name: &str) -> GameStatePayload {
    ws_send_event_msgpack(stream, &ClientEvent::PlayerJoin(make_join(name))).await;
    let (format, event) = ws_read_framed_event(stream).await;
    assert_eq!(format, WireFormat::MsgPack, "Reply should match the join format");
    expect_game_state(event)
}

fn expect_game_state(event: ServerEvent) -> GameStatePayload {
    match event {
        ServerEvent::GameState(state) => state,
        other => panic!("Expected gameState, got: {other:?}"),
    }
}

fn decode_frame(msg: Message) -> Option<(WireFormat, ServerEvent)> {
    match msg {
        Message::Text(text) => Some((
            WireFormat::Json,
            decode_server_event(WireFormat::Json, text.as_str().as_bytes()).unwrap(),
        )),
        Message::Binary(data) => Some((
            WireFormat::MsgPack,
            decode_server_event(WireFormat::MsgPack, &data).unwrap(),
        )),
        _ => None,
    }
}

/// Read the next event and the frame format it arrived in (5s timeout).
pub async fn ws_read_framed_event(stream: &mut WsStream) -> (WireFormat, ServerEvent) {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
                Some(Ok(msg)) => {
                    if let Some(decoded) = decode_frame(msg) {
                        return decoded;
                    }
                },
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
            }
        }
    })
    .await
    .expect("Timed out waiting for WebSocket message")
}

/// Read the next server event (5s timeout).
pub async fn ws_read_event(stream: &mut WsStream) -> ServerEvent {
    ws_read_framed_event(stream).await.1
}

/// Try to read a server event, returning None on timeout.
pub async fn ws_try_read_event(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerEvent> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    panic!("WebSocket error or closed")
                },
                Some(Ok(msg)) => {
                    if let Some((_, event)) = decode_frame(msg) {
                        return event;
                    }
                },
            }
        }
    })
    .await
    .ok()
}

/// Fetch and parse `/health`.
pub async fn health(server: &TestServer) -> serde_json::Value {
    reqwest::get(format!("{}/health", server.base_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}
