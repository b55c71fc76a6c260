//! Entity variants and the capability interface shared by all of them.

use crate::config::GameTuning;
use crate::enemy::EnemyBrain;
use crate::growth::{GrowthState, radius_for_level};
use crate::net::messages::{ConnectionId, PlayerSnapshot, UpdatePayload};
use crate::player::FishColors;
use crate::pool::Food;

/// Anything that occupies a circle in the world.
pub trait Body {
    fn position(&self) -> (f32, f32);
    fn radius(&self) -> f32;
    fn is_alive(&self) -> bool {
        true
    }
}

/// Which variant an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    LocalPlayer,
    RemotePlayer,
    Enemy,
    Food,
}

/// Borrowed view over any entity variant.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    LocalPlayer(&'a LocalPlayer),
    RemotePlayer(&'a RemotePlayer),
    Enemy(&'a Enemy),
    Food(&'a Food),
}

impl Entity<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::LocalPlayer(_) => EntityKind::LocalPlayer,
            Self::RemotePlayer(_) => EntityKind::RemotePlayer,
            Self::Enemy(_) => EntityKind::Enemy,
            Self::Food(_) => EntityKind::Food,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::LocalPlayer(p) => &p.id,
            Self::RemotePlayer(p) => &p.id,
            Self::Enemy(e) => &e.id,
            Self::Food(f) => &f.id,
        }
    }

    /// Size level used for predation rewards. Food counts as one unit.
    pub fn size_level(&self) -> u32 {
        match self {
            Self::LocalPlayer(p) => p.growth.size_level(),
            Self::RemotePlayer(p) => p.size_level,
            Self::Enemy(e) => e.growth.size_level(),
            Self::Food(_) => 1,
        }
    }
}

impl Body for Entity<'_> {
    fn position(&self) -> (f32, f32) {
        match self {
            Self::LocalPlayer(p) => p.position(),
            Self::RemotePlayer(p) => p.position(),
            Self::Enemy(e) => e.position(),
            Self::Food(f) => f.position(),
        }
    }

    fn radius(&self) -> f32 {
        match self {
            Self::LocalPlayer(p) => p.radius(),
            Self::RemotePlayer(p) => p.radius(),
            Self::Enemy(e) => e.radius(),
            Self::Food(f) => f.radius(),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::LocalPlayer(p) => p.is_alive(),
            Self::RemotePlayer(p) => p.is_alive(),
            Self::Enemy(e) => e.is_alive(),
            Self::Food(f) => f.is_alive(),
        }
    }
}

impl Body for Food {
    fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}

/// The fish controlled by this client.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    /// Locally assigned until the server hands out a connection id.
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub growth: GrowthState,
    pub alive: bool,
    pub colors: FishColors,
    /// Steering target supplied by the input collaborator.
    pub target: Option<(f32, f32)>,
    /// Ticks left until respawn while dead.
    pub respawn_in: u32,
}

impl LocalPlayer {
    pub fn new(name: impl Into<String>, x: f32, y: f32, tuning: &GameTuning) -> Self {
        Self {
            id: "local".to_string(),
            name: name.into(),
            x,
            y,
            angle: 0.0,
            growth: GrowthState::new(tuning),
            alive: true,
            colors: FishColors::default(),
            target: None,
            respawn_in: 0,
        }
    }

    /// Networked subset of the local state for `playerUpdate`.
    pub fn update_payload(&self) -> UpdatePayload {
        UpdatePayload {
            x: self.x,
            y: self.y,
            radius: self.growth.radius(),
            angle: self.angle,
            score: self.growth.score(),
            size_level: self.growth.size_level(),
            is_alive: self.alive,
        }
    }
}

impl Body for LocalPlayer {
    fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    fn radius(&self) -> f32 {
        self.growth.radius()
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Cached copy of another client's fish.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub id: ConnectionId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub size_level: u32,
    pub score: u64,
    pub alive: bool,
    pub colors: FishColors,
    radius: f32,
}

impl RemotePlayer {
    /// Build from a server snapshot. The radius is reconstructed from the
    /// size level; the reported radius is ignored.
    pub fn from_snapshot(snapshot: &PlayerSnapshot, tuning: &GameTuning) -> Self {
        let size_level = snapshot.size_level.max(1);
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            x: finite_or(snapshot.x, 0.0),
            y: finite_or(snapshot.y, 0.0),
            angle: finite_or(snapshot.angle, 0.0),
            size_level,
            score: snapshot.score,
            alive: snapshot.is_alive,
            colors: FishColors {
                color: snapshot.color.clone(),
                eye_color: snapshot.eye_color.clone(),
                pupil_color: snapshot.pupil_color.clone(),
            },
            radius: radius_for_level(size_level, tuning),
        }
    }

    /// Last-snapshot-wins overwrite of the mutable fields.
    pub fn apply_snapshot(&mut self, snapshot: &PlayerSnapshot, tuning: &GameTuning) {
        self.x = finite_or(snapshot.x, self.x);
        self.y = finite_or(snapshot.y, self.y);
        self.angle = finite_or(snapshot.angle, self.angle);
        self.set_level(snapshot.size_level, tuning);
        self.score = snapshot.score;
        self.alive = snapshot.is_alive;
    }

    pub fn set_level(&mut self, level: u32, tuning: &GameTuning) {
        self.size_level = level.max(1);
        self.radius = radius_for_level(self.size_level, tuning);
    }
}

impl Body for RemotePlayer {
    fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Non-networked AI fish simulated by each client independently.
#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub growth: GrowthState,
    pub alive: bool,
    pub brain: EnemyBrain,
}

impl Enemy {
    pub fn new(id: impl Into<String>, x: f32, y: f32, level: u32, tuning: &GameTuning) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            growth: GrowthState::from_level(level, tuning),
            alive: true,
            brain: EnemyBrain::default(),
        }
    }
}

impl Body for Enemy {
    fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    fn radius(&self) -> f32 {
        self.growth.radius()
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

pub(crate) fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Clamp a coordinate into `[margin, extent - margin]`. When the extent is
/// smaller than twice the margin the coordinate collapses to the center.
pub fn clamp_axis(value: f32, margin: f32, extent: f32) -> f32 {
    let lo = margin;
    let hi = extent - margin;
    if hi < lo {
        return extent / 2.0;
    }
    value.clamp(lo, hi)
}
