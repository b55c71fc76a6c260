use shoal_core::net::protocol::WireFormat;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000/ws";

/// Settings for a headless client, read from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub name: String,
    /// Simulation frames per second.
    pub frame_rate: u32,
    /// Framing used for the whole connection.
    pub format: WireFormat,
    /// Stop after this many frames; `None` runs until interrupted.
    pub max_frames: Option<u64>,
    /// Give up on the server if `gameState` has not arrived by then.
    pub handshake_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            name: "Bot".to_string(),
            frame_rate: 60,
            format: WireFormat::Json,
            max_frames: None,
            handshake_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overrides: `SHOAL_SERVER_URL`, `SHOAL_PLAYER_NAME`, `SHOAL_FRAME_RATE`,
    /// `SHOAL_WIRE_FORMAT` (`json` or `msgpack`), `SHOAL_MAX_FRAMES`,
    /// `SHOAL_HANDSHAKE_TIMEOUT_MS`.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("SHOAL_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(name) = get("SHOAL_PLAYER_NAME") {
            self.name = name;
        }
        if let Some(rate) = get("SHOAL_FRAME_RATE") {
            match rate.parse::<u32>() {
                Ok(r) if r > 0 => self.frame_rate = r,
                _ => tracing::warn!(value = %rate, "Ignoring invalid SHOAL_FRAME_RATE"),
            }
        }
        if let Some(format) = get("SHOAL_WIRE_FORMAT") {
            match format.to_ascii_lowercase().as_str() {
                "json" => self.format = WireFormat::Json,
                "msgpack" => self.format = WireFormat::MsgPack,
                _ => tracing::warn!(value = %format, "Ignoring unknown SHOAL_WIRE_FORMAT"),
            }
        }
        if let Some(frames) = get("SHOAL_MAX_FRAMES")
            && let Ok(n) = frames.parse::<u64>()
        {
            self.max_frames = Some(n);
        }
        if let Some(timeout) = get("SHOAL_HANDSHAKE_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) if ms > 0 => self.handshake_timeout_ms = ms,
                _ => tracing::warn!(value = %timeout, "Ignoring invalid SHOAL_HANDSHAKE_TIMEOUT_MS"),
            }
        }
    }

    /// Fixed step in seconds.
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frame_rate.max(1) as f32
    }
}
