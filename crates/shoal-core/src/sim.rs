//! Client-side simulation step.
//!
//! `World::step` is a pure synchronous function of the world, an explicit
//! [`SimulationContext`] and an RNG. An external driver calls it once per
//! frame; nothing here touches the network or a scheduler.

use std::collections::HashMap;

use rand::Rng;

use crate::collision::{resolve_enemies, resolve_food, resolve_remotes};
use crate::config::GameTuning;
use crate::enemy::steer;
use crate::entity::{Body, Enemy, Entity, LocalPlayer, RemotePlayer, clamp_axis};
use crate::growth::BoostOutcome;
use crate::net::messages::ConnectionId;
use crate::player::FishColors;
use crate::pool::{Food, FoodField};

/// World dimensions. Merged with `max` when peers report larger worlds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn merge(&mut self, width: f32, height: f32) {
        if width.is_finite() {
            self.width = self.width.max(width);
        }
        if height.is_finite() {
            self.height = self.height.max(height);
        }
    }
}

/// Viewport center, clamped so the view never leaves the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Camera {
    pub fn follow(&mut self, target: (f32, f32), world: &WorldBounds) {
        self.x = clamp_axis(target.0, self.viewport_width / 2.0, world.width);
        self.y = clamp_axis(target.1, self.viewport_height / 2.0, world.height);
    }
}

/// Everything a simulation step needs besides the world itself.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    /// Seconds since the previous step.
    pub dt: f32,
    pub world: WorldBounds,
    pub camera: Camera,
    pub tuning: GameTuning,
}

impl SimulationContext {
    pub fn new(tuning: GameTuning, dt: f32) -> Self {
        Self {
            dt,
            world: WorldBounds {
                width: tuning.world_width,
                height: tuning.world_height,
            },
            camera: Camera {
                x: 0.0,
                y: 0.0,
                viewport_width: 1280.0,
                viewport_height: 720.0,
            },
            tuning,
        }
    }
}

/// Something that happened during a step that other layers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    FoodEaten(String),
    PlayerEaten(ConnectionId),
    EnemyEaten(String),
    LocalDied { by: String },
    LocalRespawned,
    LevelChanged { from: u32, to: u32 },
}

/// Local simulation state: the local fish plus cached copies of everything else.
#[derive(Debug, Clone)]
pub struct World {
    pub local: LocalPlayer,
    pub remotes: HashMap<ConnectionId, RemotePlayer>,
    pub foods: FoodField,
    pub enemies: Vec<Enemy>,
    /// Spawn food locally (single-player fallback).
    offline_food: bool,
    spawn_elapsed_ms: f32,
    next_local_id: u64,
}

pub fn random_point<R: Rng>(rng: &mut R, world: &WorldBounds, margin: f32) -> (f32, f32) {
    let x = if world.width > 2.0 * margin {
        rng.random_range(margin..world.width - margin)
    } else {
        world.width / 2.0
    };
    let y = if world.height > 2.0 * margin {
        rng.random_range(margin..world.height - margin)
    } else {
        world.height / 2.0
    };
    (x, y)
}

impl World {
    pub fn new<R: Rng>(name: &str, ctx: &SimulationContext, rng: &mut R) -> Self {
        let (x, y) = random_point(rng, &ctx.world, ctx.tuning.base_radius);
        let mut local = LocalPlayer::new(name, x, y, &ctx.tuning);
        local.colors = FishColors::from_palette(rng.random_range(0..FishColors::PALETTE.len()));
        Self::with_local(local)
    }

    /// A world with no enemies or food.
    pub fn with_local(local: LocalPlayer) -> Self {
        Self {
            local,
            remotes: HashMap::new(),
            foods: FoodField::new(),
            enemies: Vec::new(),
            offline_food: false,
            spawn_elapsed_ms: 0.0,
            next_local_id: 1,
        }
    }

    pub fn set_offline_food(&mut self, enabled: bool) {
        self.offline_food = enabled;
        self.spawn_elapsed_ms = 0.0;
    }

    pub fn offline_food(&self) -> bool {
        self.offline_food
    }

    pub fn set_target(&mut self, target: Option<(f32, f32)>) {
        self.local.target = target;
    }

    pub fn set_boost(&mut self, boosting: bool) {
        if boosting && self.local.alive {
            self.local.growth.start_boost();
        } else {
            self.local.growth.stop_boost();
        }
    }

    /// Remote players currently alive.
    pub fn visible_peers(&self) -> usize {
        self.remotes.values().filter(|r| r.alive).count()
    }

    fn alloc_local_id(&mut self, prefix: &str) -> String {
        let id = self.next_local_id;
        self.next_local_id += 1;
        format!("{prefix}-{id}")
    }

    /// Advance the world by one frame.
    pub fn step<R: Rng>(&mut self, ctx: &SimulationContext, rng: &mut R) -> Vec<SimEvent> {
        let tuning = &ctx.tuning;
        let mut events = Vec::new();

        if !self.local.alive {
            self.tick_respawn(ctx, rng, &mut events);
        }

        let level_before = self.local.growth.size_level();
        if self.local.alive {
            self.move_local(ctx);
            if self.local.growth.boost_tick(tuning) == BoostOutcome::Exhausted {
                tracing::debug!("Boost exhausted at minimum level");
            }
        }

        self.think_enemies(ctx, rng);

        resolve_food(&mut self.local, &mut self.foods, tuning, &mut events);
        resolve_remotes(&mut self.local, &mut self.remotes, tuning, &mut events);
        resolve_enemies(&mut self.local, &mut self.enemies, tuning, &mut events);

        let level_after = self.local.growth.size_level();
        if level_after != level_before {
            events.push(SimEvent::LevelChanged {
                from: level_before,
                to: level_after,
            });
        }

        self.replenish_enemies(ctx, rng);
        if self.offline_food {
            self.spawn_offline_food(ctx, rng);
        }
        events
    }

    /// Camera follows the local fish, clamped to the world.
    pub fn update_camera(&self, ctx: &mut SimulationContext) {
        let target = self.local.position();
        let world = ctx.world;
        ctx.camera.follow(target, &world);
    }

    fn tick_respawn<R: Rng>(
        &mut self,
        ctx: &SimulationContext,
        rng: &mut R,
        events: &mut Vec<SimEvent>,
    ) {
        self.local.respawn_in = self.local.respawn_in.saturating_sub(1);
        if self.local.respawn_in > 0 {
            return;
        }
        self.respawn_local(ctx, rng);
        events.push(SimEvent::LocalRespawned);
    }

    /// Level 1, half the score, somewhere random.
    pub fn respawn_local<R: Rng>(&mut self, ctx: &SimulationContext, rng: &mut R) {
        self.local.growth.reset(&ctx.tuning);
        self.local.growth.halve_score();
        let (x, y) = random_point(rng, &ctx.world, self.local.growth.radius());
        self.local.x = x;
        self.local.y = y;
        self.local.alive = true;
        self.local.respawn_in = 0;
        self.local.target = None;
    }

    fn move_local(&mut self, ctx: &SimulationContext) {
        let speed = self.local.growth.current_speed(&ctx.tuning);
        if let Some((tx, ty)) = self.local.target {
            let dx = tx - self.local.x;
            let dy = ty - self.local.y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist.is_finite() && dist > 1.0 {
                self.local.angle = dy.atan2(dx);
                let step = (speed * ctx.dt).min(dist);
                self.local.x += dx / dist * step;
                self.local.y += dy / dist * step;
            }
        }
        let r = self.local.growth.radius();
        self.local.x = clamp_axis(self.local.x, r, ctx.world.width);
        self.local.y = clamp_axis(self.local.y, r, ctx.world.height);
    }

    fn think_enemies<R: Rng>(&mut self, ctx: &SimulationContext, rng: &mut R) {
        let brains: Vec<_> = {
            let mut views: Vec<Entity<'_>> =
                Vec::with_capacity(1 + self.enemies.len() + self.remotes.len());
            views.push(Entity::LocalPlayer(&self.local));
            views.extend(self.enemies.iter().map(Entity::Enemy));
            views.extend(self.remotes.values().map(Entity::RemotePlayer));

            self.enemies
                .iter()
                .map(|e| {
                    let mut brain = e.brain.clone();
                    if e.alive {
                        brain.think(&e.id, e, &views, &ctx.tuning, rng);
                    }
                    brain
                })
                .collect()
        };

        let world = (ctx.world.width, ctx.world.height);
        for (enemy, brain) in self.enemies.iter_mut().zip(brains) {
            enemy.brain = brain;
            if enemy.alive {
                steer(enemy, ctx.dt, world, &ctx.tuning);
            }
        }
    }

    fn replenish_enemies<R: Rng>(&mut self, ctx: &SimulationContext, rng: &mut R) {
        self.enemies.retain(|e| e.alive);
        while self.enemies.len() < ctx.tuning.enemy_count {
            let max_level = self.local.growth.size_level() + 2;
            let level = rng.random_range(1..=max_level);
            let margin = crate::growth::radius_for_level(level, &ctx.tuning);
            let mut pos = random_point(rng, &ctx.world, margin);
            // Keep new enemies out of the local fish's face when the world allows it.
            for _ in 0..8 {
                let dx = pos.0 - self.local.x;
                let dy = pos.1 - self.local.y;
                if (dx * dx + dy * dy).sqrt() > ctx.tuning.hunt_radius {
                    break;
                }
                pos = random_point(rng, &ctx.world, margin);
            }
            let id = self.alloc_local_id("enemy");
            self.enemies
                .push(Enemy::new(id, pos.0, pos.1, level, &ctx.tuning));
        }
    }

    fn spawn_offline_food<R: Rng>(&mut self, ctx: &SimulationContext, rng: &mut R) {
        self.spawn_elapsed_ms += ctx.dt * 1000.0;
        let period = ctx.tuning.offline_spawn_period_ms as f32;
        while self.spawn_elapsed_ms >= period {
            self.spawn_elapsed_ms -= period;
            if self.foods.len() >= ctx.tuning.offline_max_food {
                continue;
            }
            let (x, y) = random_point(rng, &ctx.world, ctx.tuning.food_radius);
            let id = self.alloc_local_id("local-food");
            let color = FishColors::PALETTE[rng.random_range(0..FishColors::PALETTE.len())];
            self.foods.insert(Food {
                id,
                x,
                y,
                radius: ctx.tuning.food_radius,
                color: color.to_string(),
            });
        }
    }
}
