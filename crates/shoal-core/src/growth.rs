//! Size levels, growth progress, boost drain and shrink-on-deplete.
//!
//! Radius, speed and the level-up threshold are pure functions of the size
//! level. `GrowthState` recomputes them on every level change instead of
//! mutating them incrementally, so any two representations of the same
//! level (local player, remote copy, enemy) always agree.

use serde::{Deserialize, Serialize};

use crate::config::GameTuning;

/// Radius increment added when reaching `level`.
pub fn radius_step(level: u32) -> f32 {
    (5 + (level / 2) * 2) as f32
}

/// Canonical growth curve: `R0` plus `radius_step(i)` for every `i` in `2..=level`.
pub fn radius_for_level(level: u32, tuning: &GameTuning) -> f32 {
    let level = level.max(1);
    let steps: f32 = (2..=level).map(radius_step).sum();
    tuning.base_radius + steps
}

/// Consumed units needed to leave `level`: the base threshold with
/// `floor(x * level_up_factor)` applied once per level gained.
pub fn fish_needed_for_level(level: u32, tuning: &GameTuning) -> u32 {
    let factor = f64::from(tuning.level_up_factor);
    let mut needed = tuning.base_fish_needed.max(1);
    for _ in 1..level.max(1) {
        let next = (f64::from(needed) * factor).floor();
        let next = if next >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            next as u32
        };
        needed = next.max(needed.saturating_add(1));
    }
    needed
}

/// Base movement speed at `level`, never below `min_speed`.
pub fn speed_for_level(level: u32, tuning: &GameTuning) -> f32 {
    let exp = level.max(1).saturating_sub(1).min(i32::MAX as u32) as i32;
    (tuning.base_speed * tuning.speed_factor.powi(exp)).max(tuning.min_speed)
}

/// What a single boost tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostOutcome {
    /// Not boosting.
    Idle,
    /// Progress within the current level was drained.
    Drained,
    /// The level was empty, so the fish dropped a level and kept boosting.
    Shrunk,
    /// Level 1 with nothing left; boosting was switched off.
    Exhausted,
}

/// Growth state of a player-like entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthState {
    size_level: u32,
    fish_eaten: f32,
    fish_needed_to_grow: u32,
    radius: f32,
    speed: f32,
    boosting: bool,
    score: u64,
}

impl GrowthState {
    pub fn new(tuning: &GameTuning) -> Self {
        Self::from_level(1, tuning)
    }

    /// Reconstruct the derived fields for a fish at `level` with no progress.
    pub fn from_level(level: u32, tuning: &GameTuning) -> Self {
        let level = level.max(1);
        Self {
            size_level: level,
            fish_eaten: 0.0,
            fish_needed_to_grow: fish_needed_for_level(level, tuning),
            radius: radius_for_level(level, tuning),
            speed: speed_for_level(level, tuning),
            boosting: false,
            score: 0,
        }
    }

    pub fn size_level(&self) -> u32 {
        self.size_level
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn fish_needed_to_grow(&self) -> u32 {
        self.fish_needed_to_grow
    }

    /// Raw consumed units toward the next level.
    pub fn fish_eaten(&self) -> f32 {
        self.fish_eaten
    }

    /// Fraction of the current level completed, in `[0, 1]`.
    pub fn growth_progress(&self) -> f32 {
        (self.fish_eaten / self.fish_needed_to_grow as f32).clamp(0.0, 1.0)
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_boosting(&self) -> bool {
        self.boosting
    }

    /// Base speed for the current level, ignoring boost.
    pub fn base_speed(&self) -> f32 {
        self.speed
    }

    /// Effective speed, including the boost multiplier.
    pub fn current_speed(&self, tuning: &GameTuning) -> f32 {
        if self.boosting {
            self.speed * tuning.boost_multiplier
        } else {
            self.speed
        }
    }

    /// Consume `amount` units. Returns true when this caused a level-up.
    ///
    /// Negative, zero and non-finite amounts are ignored: boosting is the
    /// only path allowed to reduce progress.
    pub fn eat(&mut self, amount: f32, tuning: &GameTuning) -> bool {
        if !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        let gained = f64::from(amount) * tuning.score_per_unit as f64 * f64::from(self.size_level);
        self.score = self.score.saturating_add(gained.round() as u64);
        self.fish_eaten += amount;
        if self.fish_eaten >= self.fish_needed_to_grow as f32 {
            self.level_up(tuning);
            return true;
        }
        false
    }

    pub fn level_up(&mut self, tuning: &GameTuning) {
        self.size_level = self.size_level.saturating_add(1);
        self.fish_eaten = 0.0;
        self.recompute(tuning);
    }

    /// Drop one level. Returns false (and changes nothing) at level 1.
    pub fn shrink(&mut self, tuning: &GameTuning) -> bool {
        if self.size_level <= 1 {
            return false;
        }
        self.size_level -= 1;
        self.fish_eaten = 0.0;
        self.recompute(tuning);
        true
    }

    pub fn start_boost(&mut self) {
        self.boosting = true;
    }

    pub fn stop_boost(&mut self) {
        self.boosting = false;
    }

    /// Apply one simulation tick of boost drain.
    pub fn boost_tick(&mut self, tuning: &GameTuning) -> BoostOutcome {
        if !self.boosting {
            return BoostOutcome::Idle;
        }
        if self.fish_eaten > 0.0 {
            let drain = tuning.boost_drain_fraction * self.fish_needed_to_grow as f32;
            self.fish_eaten = (self.fish_eaten - drain).max(0.0);
            BoostOutcome::Drained
        } else if self.shrink(tuning) {
            self.fish_eaten = tuning.shrink_seed_progress * self.fish_needed_to_grow as f32;
            BoostOutcome::Shrunk
        } else {
            self.boosting = false;
            BoostOutcome::Exhausted
        }
    }

    /// Back to level 1, keeping the score.
    pub fn reset(&mut self, tuning: &GameTuning) {
        let score = self.score;
        *self = Self::new(tuning);
        self.score = score;
    }

    /// Death penalty applied at respawn.
    pub fn halve_score(&mut self) {
        self.score /= 2;
    }

    /// Overwrite the score from an authoritative source.
    pub fn set_score(&mut self, score: u64) {
        self.score = score;
    }

    fn recompute(&mut self, tuning: &GameTuning) {
        self.fish_needed_to_grow = fish_needed_for_level(self.size_level, tuning);
        self.radius = radius_for_level(self.size_level, tuning);
        self.speed = speed_for_level(self.size_level, tuning);
    }
}
