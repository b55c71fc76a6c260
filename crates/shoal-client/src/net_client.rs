use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;

use shoal_core::net::messages::{ClientEvent, ServerEvent};
use shoal_core::net::protocol::{
    ProtocolError, WireFormat, decode_server_event, encode_client_event, encode_client_text,
};

const OUTBOUND_BUFFER: usize = 256;
const INBOUND_BUFFER: usize = 1024;

#[derive(Debug)]
pub enum TransportError {
    Connect(String),
    Closed,
    Protocol(ProtocolError),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "connect failed: {e}"),
            Self::Closed => write!(f, "connection closed"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProtocolError> for TransportError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

/// WebSocket connection to the relay. Reader and writer run as tasks;
/// the frame loop drains decoded events and queues outgoing ones.
pub struct WsClient {
    outbound: mpsc::Sender<Message>,
    inbound: mpsc::Receiver<ServerEvent>,
    connected: Arc<AtomicBool>,
    format: WireFormat,
}

impl WsClient {
    pub async fn connect(url: &str, format: WireFormat) -> Result<Self, TransportError> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::info!(url, "WebSocket connected");
        let (mut sink, mut source) = stream.split();

        let connected = Arc::new(AtomicBool::new(true));
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
        let (in_tx, in_rx) = mpsc::channel::<ServerEvent>(INBOUND_BUFFER);

        let flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if sink.send(frame).await.is_err() {
                    break;
                }
            }
            flag.store(false, Ordering::Relaxed);
            let _ = sink.close().await;
        });

        let flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while let Some(Ok(msg)) = source.next().await {
                let decoded = match &msg {
                    Message::Text(text) => {
                        decode_server_event(WireFormat::Json, text.as_str().as_bytes())
                    },
                    Message::Binary(data) => decode_server_event(WireFormat::MsgPack, data),
                    Message::Close(_) => break,
                    _ => continue,
                };
                match decoded {
                    Ok(event) => {
                        if in_tx.send(event).await.is_err() {
                            break;
                        }
                    },
                    Err(e) => tracing::debug!(error = %e, "Undecodable server frame dropped"),
                }
            }
            flag.store(false, Ordering::Relaxed);
            tracing::info!("WebSocket closed");
        });

        Ok(Self {
            outbound: out_tx,
            inbound: in_rx,
            connected,
            format,
        })
    }

    /// Queue an event. A full queue drops the event; a closed one is an error.
    pub fn send(&self, event: &ClientEvent) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        let frame = match self.format {
            WireFormat::Json => Message::Text(encode_client_text(event)?.into()),
            WireFormat::MsgPack => {
                Message::Binary(encode_client_event(WireFormat::MsgPack, event)?.into())
            },
        };
        match self.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                tracing::debug!(event = event.name(), "Outbound queue full, dropping");
                Ok(())
            },
            Err(TrySendError::Closed(_)) => Err(TransportError::Closed),
        }
    }

    /// Every event received since the last call, in arrival order.
    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbound.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }
}
