//! Canonical game state: the player registry and food existence.
//!
//! Pure and synchronous. The hub owns one instance behind its lock and
//! decides what to broadcast from the return values here.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use shoal_core::net::messages::{
    ConnectionId, GameStatePayload, JoinPayload, PlayerSnapshot, RespawnPayload, UpdatePayload,
};
use shoal_core::player::{FishColors, sanitize_color, sanitize_name};
use shoal_core::pool::{Food, FoodField};

use crate::config::ServerConfig;

const FOOD_COLORS: &[&str] = &[
    "#ff6b6b", "#feca57", "#48dbfb", "#1dd1a1", "#ff9ff3", "#54a0ff",
];

pub struct ServerAuthority {
    players: HashMap<ConnectionId, PlayerSnapshot>,
    foods: FoodField,
    connected_players: usize,
    world_width: f32,
    world_height: f32,
    next_food_id: u64,
    solo_period: Duration,
    crowd_period: Duration,
    max_food: usize,
    food_radius: f32,
    max_name_len: usize,
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Radii must be finite and non-negative.
fn sane_radius(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        fallback
    }
}

impl ServerAuthority {
    /// Build from config and seed `food.initial_food` pellets.
    pub fn new<R: Rng>(config: &ServerConfig, rng: &mut R) -> Self {
        let mut authority = Self {
            players: HashMap::new(),
            foods: FoodField::new(),
            connected_players: 0,
            world_width: config.world.width,
            world_height: config.world.height,
            next_food_id: 1,
            solo_period: config.food.solo_period(),
            crowd_period: config.food.crowd_period(),
            max_food: config.food.max_food,
            food_radius: config.food.food_radius,
            max_name_len: config.limits.max_name_len,
        };
        for _ in 0..config.food.initial_food {
            authority.spawn_food(rng);
        }
        authority
    }

    /// Register a connection's player. Returns the full state for the joiner.
    ///
    /// A repeated join from the same connection overwrites the snapshot
    /// without counting the connection twice.
    pub fn join(&mut self, id: &str, join: JoinPayload) -> GameStatePayload {
        if join.world_width.is_finite() && join.world_width > 0.0 {
            self.world_width = self.world_width.max(join.world_width);
        }
        if join.world_height.is_finite() && join.world_height > 0.0 {
            self.world_height = self.world_height.max(join.world_height);
        }

        let defaults = FishColors::default();
        let snapshot = PlayerSnapshot {
            id: id.to_string(),
            name: sanitize_name(&join.name, self.max_name_len),
            x: finite_or(join.x, self.world_width / 2.0),
            y: finite_or(join.y, self.world_height / 2.0),
            radius: sane_radius(join.radius, 0.0),
            angle: finite_or(join.angle, 0.0),
            score: 0,
            size_level: 1,
            is_alive: true,
            color: sanitize_color(&join.color, &defaults.color),
            eye_color: sanitize_color(&join.eye_color, &defaults.eye_color),
            pupil_color: sanitize_color(&join.pupil_color, &defaults.pupil_color),
        };
        if self.players.insert(id.to_string(), snapshot).is_none() {
            self.connected_players += 1;
        }
        self.snapshot_for(id)
    }

    /// Last-write-wins overwrite of a player's mutable fields. `None` if the
    /// connection has no player.
    pub fn update_player(&mut self, id: &str, update: &UpdatePayload) -> Option<PlayerSnapshot> {
        let player = self.players.get_mut(id)?;
        player.x = finite_or(update.x, player.x);
        player.y = finite_or(update.y, player.y);
        player.radius = sane_radius(update.radius, player.radius);
        player.angle = finite_or(update.angle, player.angle);
        player.score = update.score;
        player.size_level = update.size_level.max(1);
        player.is_alive = update.is_alive;
        Some(player.clone())
    }

    /// Remove a pellet. True only for the first report of a given id.
    pub fn consume_food(&mut self, food_id: &str) -> bool {
        self.foods.remove(food_id).is_some()
    }

    /// Flip a player to dead without removing it. True only when the player
    /// exists and was alive, so duplicate reports are no-ops.
    pub fn mark_eaten(&mut self, id: &str) -> bool {
        match self.players.get_mut(id) {
            Some(player) if player.is_alive => {
                player.is_alive = false;
                true
            },
            _ => false,
        }
    }

    pub fn respawn(&mut self, id: &str, respawn: &RespawnPayload) -> Option<PlayerSnapshot> {
        let player = self.players.get_mut(id)?;
        player.x = finite_or(respawn.x, player.x);
        player.y = finite_or(respawn.y, player.y);
        player.radius = sane_radius(respawn.radius, player.radius);
        player.score = respawn.score;
        player.size_level = respawn.size_level.max(1);
        player.is_alive = true;
        Some(player.clone())
    }

    /// Remove a connection's player. False if it never joined.
    pub fn leave(&mut self, id: &str) -> bool {
        if self.players.remove(id).is_some() {
            self.connected_players = self.connected_players.saturating_sub(1);
            true
        } else {
            false
        }
    }

    /// Create one pellet at a random position, unless the field is full.
    pub fn spawn_food<R: Rng>(&mut self, rng: &mut R) -> Option<Food> {
        if self.foods.len() >= self.max_food {
            return None;
        }
        let margin = self.food_radius;
        let food = Food {
            id: format!("food-{}", self.next_food_id),
            x: random_axis(rng, margin, self.world_width),
            y: random_axis(rng, margin, self.world_height),
            radius: self.food_radius,
            color: FOOD_COLORS[rng.random_range(0..FOOD_COLORS.len())].to_string(),
        };
        self.next_food_id += 1;
        self.foods.insert(food.clone());
        Some(food)
    }

    /// Full state as seen by `self_id`.
    pub fn snapshot_for(&self, self_id: &str) -> GameStatePayload {
        GameStatePayload {
            self_id: self_id.to_string(),
            players: self.players.clone(),
            foods: self.foods.snapshot(),
            world_width: self.world_width,
            world_height: self.world_height,
            connected_players: self.connected_players,
        }
    }

    /// Food spawn period for the current population; `None` pauses spawning.
    pub fn spawn_period(&self) -> Option<Duration> {
        match self.connected_players {
            0 => None,
            1 => Some(self.solo_period),
            _ => Some(self.crowd_period),
        }
    }

    /// Fan-out to other clients only happens with an audience.
    pub fn should_broadcast(party_count: usize) -> bool {
        party_count > 1
    }

    pub fn connected_players(&self) -> usize {
        self.connected_players
    }

    pub fn food_count(&self) -> usize {
        self.foods.len()
    }

    pub fn player(&self, id: &str) -> Option<&PlayerSnapshot> {
        self.players.get(id)
    }

    pub fn world_size(&self) -> (f32, f32) {
        (self.world_width, self.world_height)
    }
}

fn random_axis<R: Rng>(rng: &mut R, margin: f32, extent: f32) -> f32 {
    if extent > 2.0 * margin {
        rng.random_range(margin..extent - margin)
    } else {
        extent / 2.0
    }
}
