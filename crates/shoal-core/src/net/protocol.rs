use serde::Serialize;
use serde::de::DeserializeOwned;

use super::messages::{ClientEvent, ServerEvent};

/// Maximum size of a client event in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

/// Maximum size of a server event in bytes. `gameState` grows with the
/// room, so server frames get their own, larger cap.
pub const MAX_SERVER_MESSAGE_SIZE: usize = 8 * 1024 * 1024; // 8 MiB

/// Framing of an event on the wire. Text frames carry JSON, binary frames
/// carry MessagePack with named fields; both encode the same event model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    MsgPack,
}

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode any serializable event in the given format, rejecting output
/// larger than `limit` bytes.
pub fn encode_message<T: Serialize>(
    format: WireFormat,
    payload: &T,
    limit: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let bytes = match format {
        WireFormat::Json => serde_json::to_vec(payload)
            .map_err(|e| ProtocolError::SerializeError(e.to_string()))?,
        WireFormat::MsgPack => rmp_serde::to_vec_named(payload)
            .map_err(|e| ProtocolError::SerializeError(e.to_string()))?,
    };
    if bytes.len() > limit {
        return Err(ProtocolError::PayloadTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Decode an event in the given format, rejecting input larger than
/// `limit` bytes before parsing.
pub fn decode_message<T: DeserializeOwned>(
    format: WireFormat,
    data: &[u8],
    limit: usize,
) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if data.len() > limit {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    match format {
        WireFormat::Json => serde_json::from_slice(data)
            .map_err(|e| ProtocolError::DeserializeError(e.to_string())),
        WireFormat::MsgPack => rmp_serde::from_slice(data)
            .map_err(|e| ProtocolError::DeserializeError(e.to_string())),
    }
}

pub fn encode_client_event(
    format: WireFormat,
    event: &ClientEvent,
) -> Result<Vec<u8>, ProtocolError> {
    encode_message(format, event, MAX_MESSAGE_SIZE)
}

pub fn decode_client_event(format: WireFormat, data: &[u8]) -> Result<ClientEvent, ProtocolError> {
    decode_message(format, data, MAX_MESSAGE_SIZE)
}

pub fn encode_server_event(
    format: WireFormat,
    event: &ServerEvent,
) -> Result<Vec<u8>, ProtocolError> {
    encode_message(format, event, MAX_SERVER_MESSAGE_SIZE)
}

pub fn decode_server_event(format: WireFormat, data: &[u8]) -> Result<ServerEvent, ProtocolError> {
    decode_message(format, data, MAX_SERVER_MESSAGE_SIZE)
}

/// Encode a server event as a JSON string for a text frame.
pub fn encode_server_text(event: &ServerEvent) -> Result<String, ProtocolError> {
    let bytes = encode_server_event(WireFormat::Json, event)?;
    String::from_utf8(bytes).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Encode a client event as a JSON string for a text frame.
pub fn encode_client_text(event: &ClientEvent) -> Result<String, ProtocolError> {
    let bytes = encode_client_event(WireFormat::Json, event)?;
    String::from_utf8(bytes).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}
