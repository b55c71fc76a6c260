use serde::{Deserialize, Serialize};

/// Data-driven gameplay constants shared by every participant.
///
/// Every client and the server must agree on the growth and edibility
/// fields, otherwise two clients can disagree on who may eat whom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    /// Radius of a level-1 fish.
    pub base_radius: f32,
    /// Consumed units needed to leave level 1.
    pub base_fish_needed: u32,
    /// Threshold multiplier applied (with floor) on every level-up.
    pub level_up_factor: f32,
    /// Base movement speed at level 1 (units/s).
    pub base_speed: f32,
    /// Speed multiplier applied on every level-up.
    pub speed_factor: f32,
    /// Speed never drops below this (units/s).
    pub min_speed: f32,
    /// Speed multiplier while boosting.
    pub boost_multiplier: f32,
    /// Fraction of `fish_needed_to_grow` drained per tick while boosting.
    pub boost_drain_fraction: f32,
    /// Progress seeded into the lower level after a boost-driven shrink.
    pub shrink_seed_progress: f32,
    /// `eater.radius > prey.radius * eat_threshold` is required to eat.
    pub eat_threshold: f32,
    /// Score per consumed unit, multiplied by the eater's level.
    pub score_per_unit: u64,
    /// Radius of a food pellet.
    pub food_radius: f32,
    /// Ticks a dead local player waits before respawning.
    pub respawn_ticks: u32,
    /// Enemies hunt edible prey within this distance.
    pub hunt_radius: f32,
    /// Enemies flee predators within this distance.
    pub flee_radius: f32,
    /// Shortest wander/hunt re-roll window (ticks).
    pub think_min_ticks: u32,
    /// Longest wander/hunt re-roll window (ticks).
    pub think_max_ticks: u32,
    /// Re-roll window while fleeing (ticks).
    pub flee_ticks: u32,
    /// Target number of live enemies in the local world.
    pub enemy_count: usize,
    /// Default world width when the server has not supplied one.
    pub world_width: f32,
    /// Default world height when the server has not supplied one.
    pub world_height: f32,
    /// Offline food spawn period (ms).
    pub offline_spawn_period_ms: u64,
    /// Offline food cap.
    pub offline_max_food: usize,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            base_radius: 15.0,
            base_fish_needed: 5,
            level_up_factor: 1.5,
            base_speed: 180.0,
            speed_factor: 0.95,
            min_speed: 60.0,
            boost_multiplier: 1.8,
            boost_drain_fraction: 0.01,
            shrink_seed_progress: 0.9,
            eat_threshold: 1.05,
            score_per_unit: 10,
            food_radius: 5.0,
            respawn_ticks: 180,
            hunt_radius: 300.0,
            flee_radius: 200.0,
            think_min_ticks: 150,
            think_max_ticks: 300,
            flee_ticks: 60,
            enemy_count: 8,
            world_width: 3000.0,
            world_height: 3000.0,
            offline_spawn_period_ms: 2000,
            offline_max_food: 150,
        }
    }
}

impl GameTuning {
    /// Load tuning from `SHOAL_TUNING_CONFIG`, then `config/tuning.toml`,
    /// falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("SHOAL_TUNING_CONFIG")
            && let Some(tuning) = Self::read(&path)
        {
            return tuning;
        }
        Self::read("config/tuning.toml").unwrap_or_default()
    }

    fn read(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<Self>(&contents) {
            Ok(tuning) => {
                tracing::info!(path, "Loaded gameplay tuning");
                Some(tuning.sanitized())
            },
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to parse tuning file, ignoring");
                None
            },
        }
    }

    /// Replace values that would break the growth formulas with defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !(self.base_radius.is_finite() && self.base_radius > 0.0) {
            self.base_radius = d.base_radius;
        }
        if self.base_fish_needed == 0 {
            self.base_fish_needed = d.base_fish_needed;
        }
        if !(self.level_up_factor.is_finite() && self.level_up_factor > 1.0) {
            self.level_up_factor = d.level_up_factor;
        }
        if !(self.speed_factor.is_finite() && self.speed_factor > 0.0 && self.speed_factor <= 1.0)
        {
            self.speed_factor = d.speed_factor;
        }
        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            self.min_speed = d.min_speed;
        }
        if !(self.base_speed.is_finite() && self.base_speed >= self.min_speed) {
            self.base_speed = self.min_speed.max(d.base_speed);
        }
        if !(self.eat_threshold.is_finite() && self.eat_threshold > 0.0) {
            self.eat_threshold = d.eat_threshold;
        }
        self.boost_drain_fraction = self.boost_drain_fraction.clamp(0.0001, 1.0);
        self.shrink_seed_progress = self.shrink_seed_progress.clamp(0.0, 0.99);
        if self.think_max_ticks < self.think_min_ticks {
            self.think_max_ticks = self.think_min_ticks;
        }
        self
    }
}
