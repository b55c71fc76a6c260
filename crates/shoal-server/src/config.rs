use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use shoal_core::net::messages::GameStatePayload;
use shoal_core::net::protocol::MAX_SERVER_MESSAGE_SIZE;

/// Top-level server configuration, loaded from `shoal.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub food: FoodConfig,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            limits: LimitsConfig::default(),
            food: FoodConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

/// Connection caps, buffer sizes and rate limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Inbound events per second per connection (token bucket refill rate).
    pub ws_rate_limit_per_sec: f64,
    /// Outbound queue depth per connection; slow clients drop frames beyond it.
    pub player_message_buffer: usize,
    pub max_name_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 60.0,
            player_message_buffer: 256,
            max_name_len: 16,
        }
    }
}

/// Food spawn cadence and population.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    /// Spawn period with exactly one connected player.
    pub solo_spawn_period_ms: u64,
    /// Spawn period with two or more connected players.
    pub crowd_spawn_period_ms: u64,
    pub max_food: usize,
    /// Pellets seeded at startup.
    pub initial_food: usize,
    pub food_radius: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            solo_spawn_period_ms: 2000,
            crowd_spawn_period_ms: 500,
            max_food: 300,
            initial_food: 50,
            food_radius: 5.0,
        }
    }
}

impl FoodConfig {
    pub fn solo_period(&self) -> Duration {
        Duration::from_millis(self.solo_spawn_period_ms)
    }

    pub fn crowd_period(&self) -> Duration {
        Duration::from_millis(self.crowd_spawn_period_ms)
    }
}

/// Initial world size. Joining clients may enlarge it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 3000.0,
            height: 3000.0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check every limit and address. Returns the first problem found.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            )));
        }
        if self.limits.max_ws_connections == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_ws_connections must be > 0".into(),
            ));
        }
        if !(self.limits.ws_rate_limit_per_sec > 0.0) {
            return Err(ConfigError::Invalid(
                "limits.ws_rate_limit_per_sec must be > 0".into(),
            ));
        }
        if self.limits.player_message_buffer == 0 {
            return Err(ConfigError::Invalid(
                "limits.player_message_buffer must be > 0".into(),
            ));
        }
        if self.limits.max_name_len == 0 {
            return Err(ConfigError::Invalid("limits.max_name_len must be > 0".into()));
        }
        if self.food.solo_spawn_period_ms == 0 || self.food.crowd_spawn_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "food spawn periods must be > 0".into(),
            ));
        }
        if self.food.initial_food > self.food.max_food {
            return Err(ConfigError::Invalid(
                "food.initial_food must not exceed food.max_food".into(),
            ));
        }
        if !(self.food.food_radius.is_finite() && self.food.food_radius > 0.0) {
            return Err(ConfigError::Invalid("food.food_radius must be > 0".into()));
        }
        if !(self.world.width.is_finite()
            && self.world.width > 0.0
            && self.world.height.is_finite()
            && self.world.height > 0.0)
        {
            return Err(ConfigError::Invalid("world size must be > 0".into()));
        }
        let snapshot = self.max_game_state_len();
        if snapshot > MAX_SERVER_MESSAGE_SIZE {
            return Err(ConfigError::Invalid(format!(
                "a full room ({} players, {} food) may need a {snapshot}-byte gameState, \
                 over the {MAX_SERVER_MESSAGE_SIZE}-byte frame limit",
                self.limits.max_ws_connections, self.food.max_food
            )));
        }
        Ok(())
    }

    /// Worst-case `gameState` size with every connection slot and food slot used.
    pub fn max_game_state_len(&self) -> usize {
        GameStatePayload::max_encoded_len(
            self.limits.max_ws_connections,
            self.food.max_food,
            self.limits.max_name_len,
        )
    }

    /// Validate configuration, exiting the process on the first error.
    pub fn validate(&self) {
        if let Err(e) = self.check() {
            tracing::error!(error = %e, "Invalid server configuration");
            std::process::exit(1);
        }
        if self.food.crowd_spawn_period_ms > self.food.solo_spawn_period_ms {
            tracing::warn!(
                solo_ms = self.food.solo_spawn_period_ms,
                crowd_ms = self.food.crowd_spawn_period_ms,
                "Crowd spawn period is slower than solo period"
            );
        }
    }

    /// Load config from `shoal.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match Self::from_file("shoal.toml") {
            Ok(cfg) => {
                tracing::info!("Loaded configuration from shoal.toml");
                cfg
            },
            Err(ConfigError::Io(_)) => {
                tracing::info!("No shoal.toml found, using defaults");
                Self::default()
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse shoal.toml, using defaults");
                Self::default()
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply environment overrides through `get`, so tests need not touch
    /// the process environment.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(port) = get("PORT")
            && let Ok(port) = port.trim().parse::<u16>()
        {
            let ip = self
                .listen_addr
                .parse::<SocketAddr>()
                .map(|a| a.ip())
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
            self.listen_addr = SocketAddr::new(ip, port).to_string();
        }
        if let Some(addr) = get("SHOAL_LISTEN_ADDR")
            && !addr.is_empty()
        {
            self.listen_addr = addr;
        }
        if let Some(val) = get("SHOAL_MAX_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            self.limits.max_ws_connections = n;
        }
        if let Some(val) = get("SHOAL_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            self.limits.ws_rate_limit_per_sec = n;
        }
    }
}
