use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pool::Food;

/// Connection identifier assigned by the server. Doubles as the player id.
pub type ConnectionId = String;

/// `playerJoin` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: String,
    pub eye_color: String,
    pub pupil_color: String,
    pub angle: f32,
    pub world_width: f32,
    pub world_height: f32,
}

/// `playerUpdate` payload: the owning client's periodic state report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub angle: f32,
    pub score: u64,
    pub size_level: u32,
    pub is_alive: bool,
}

/// `playerRespawn` payload: post-death reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespawnPayload {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub score: u64,
    pub size_level: u32,
}

/// Networked subset of a player's state, as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: ConnectionId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub angle: f32,
    pub score: u64,
    pub size_level: u32,
    pub is_alive: bool,
    pub color: String,
    pub eye_color: String,
    pub pupil_color: String,
}

/// Longest color string the server stores, in characters.
pub const MAX_COLOR_LEN: usize = 32;

/// Upper bounds on the encoded size of `gameState` parts. JSON is the
/// larger framing; every string char costs at most 4 bytes (UTF-8 or an
/// escaped quote/backslash, since control characters are stripped).
const STATE_ENVELOPE_BOUND: usize = 512;
const PLAYER_FIXED_BOUND: usize = 448;
const FOOD_FIXED_BOUND: usize = 128;
const CHAR_BOUND: usize = 4;

/// Full state sent once to a joining connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatePayload {
    pub self_id: ConnectionId,
    pub players: HashMap<ConnectionId, PlayerSnapshot>,
    pub foods: Vec<Food>,
    pub world_width: f32,
    pub world_height: f32,
    pub connected_players: usize,
}

impl GameStatePayload {
    /// Worst-case encoded size of a `gameState` event with `players`
    /// server-assigned players and `foods` server-spawned pellets.
    pub fn max_encoded_len(players: usize, foods: usize, max_name_len: usize) -> usize {
        let player = CHAR_BOUND
            .saturating_mul(max_name_len.saturating_add(3 * MAX_COLOR_LEN))
            .saturating_add(PLAYER_FIXED_BOUND);
        let food = FOOD_FIXED_BOUND + CHAR_BOUND * MAX_COLOR_LEN;
        STATE_ENVELOPE_BOUND
            .saturating_add(players.saturating_mul(player))
            .saturating_add(foods.saturating_mul(food))
    }
}

/// Client -> server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    PlayerJoin(JoinPayload),
    PlayerUpdate(UpdatePayload),
    FoodEaten(String),
    PlayerEaten(ConnectionId),
    PlayerRespawn(RespawnPayload),
}

impl ClientEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlayerJoin(_) => "playerJoin",
            Self::PlayerUpdate(_) => "playerUpdate",
            Self::FoodEaten(_) => "foodEaten",
            Self::PlayerEaten(_) => "playerEaten",
            Self::PlayerRespawn(_) => "playerRespawn",
        }
    }
}

/// Server -> client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    GameState(GameStatePayload),
    PlayerJoined(PlayerSnapshot),
    PlayerLeft(ConnectionId),
    PlayerMoved(PlayerSnapshot),
    PlayerDied(ConnectionId),
    PlayerRespawned(PlayerSnapshot),
    FoodSpawned(Food),
    FoodRemoved(String),
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GameState(_) => "gameState",
            Self::PlayerJoined(_) => "playerJoined",
            Self::PlayerLeft(_) => "playerLeft",
            Self::PlayerMoved(_) => "playerMoved",
            Self::PlayerDied(_) => "playerDied",
            Self::PlayerRespawned(_) => "playerRespawned",
            Self::FoodSpawned(_) => "foodSpawned",
            Self::FoodRemoved(_) => "foodRemoved",
        }
    }
}
