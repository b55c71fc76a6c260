//! Enemy (non-networked AI) behaviour: wandering, hunting and fleeing.
//!
//! Mode changes are time-boxed. Wandering and hunting re-roll only when
//! their timer expires; the only early transition is into fleeing.

use std::f32::consts::TAU;

use rand::Rng;

use crate::collision::can_eat;
use crate::config::GameTuning;
use crate::entity::{Body, Enemy, Entity, EntityKind, clamp_axis};

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Wandering,
    Hunting { target: String },
    Fleeing { from: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyBrain {
    pub mode: Mode,
    /// Heading in radians.
    pub heading: f32,
    /// Ticks until the next re-roll.
    pub timer: u32,
}

impl Default for EnemyBrain {
    fn default() -> Self {
        Self {
            mode: Mode::Wandering,
            heading: 0.0,
            timer: 0,
        }
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

fn heading_towards(from: (f32, f32), to: (f32, f32)) -> f32 {
    (to.1 - from.1).atan2(to.0 - from.0)
}

/// Can this kind of entity be hunted by an enemy? Food is server-owned and
/// remote players are simulated by their own clients.
fn huntable(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::LocalPlayer | EntityKind::Enemy)
}

impl EnemyBrain {
    pub fn is_fleeing(&self) -> bool {
        matches!(self.mode, Mode::Fleeing { .. })
    }

    /// Advance the behaviour machine by one tick.
    pub fn think<B: Body + ?Sized, R: Rng>(
        &mut self,
        my_id: &str,
        me: &B,
        neighbours: &[Entity<'_>],
        tuning: &GameTuning,
        rng: &mut R,
    ) {
        let pos = me.position();
        self.timer = self.timer.saturating_sub(1);

        let threat = neighbours
            .iter()
            .filter(|n| n.id() != my_id && n.kind() != EntityKind::Food && n.is_alive())
            .filter(|n| can_eat(*n, me, tuning.eat_threshold))
            .map(|n| (distance(pos, n.position()), n))
            .filter(|(d, _)| *d < tuning.flee_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((_, predator)) = threat {
            if !self.is_fleeing() {
                self.timer = tuning.flee_ticks;
            }
            self.mode = Mode::Fleeing {
                from: predator.id().to_string(),
            };
            self.heading = heading_towards(predator.position(), pos);
            return;
        }

        if self.timer == 0 {
            self.reroll(my_id, me, neighbours, tuning, rng);
        }

        let prey_pos = match &self.mode {
            Mode::Hunting { target } => Some(
                neighbours
                    .iter()
                    .find(|n| n.id() == target.as_str() && n.is_alive())
                    .map(|n| n.position()),
            ),
            _ => None,
        };
        match prey_pos {
            Some(Some(prey)) => self.heading = heading_towards(pos, prey),
            Some(None) => self.mode = Mode::Wandering,
            None => {},
        }
    }

    fn reroll<B: Body + ?Sized, R: Rng>(
        &mut self,
        my_id: &str,
        me: &B,
        neighbours: &[Entity<'_>],
        tuning: &GameTuning,
        rng: &mut R,
    ) {
        let pos = me.position();
        self.timer = rng.random_range(tuning.think_min_ticks..=tuning.think_max_ticks);

        let prey = neighbours
            .iter()
            .filter(|n| n.id() != my_id && huntable(n.kind()) && n.is_alive())
            .filter(|n| can_eat(me, *n, tuning.eat_threshold))
            .map(|n| (distance(pos, n.position()), n))
            .filter(|(d, _)| *d < tuning.hunt_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match prey {
            Some((_, target)) => {
                self.mode = Mode::Hunting {
                    target: target.id().to_string(),
                };
            },
            None => {
                self.mode = Mode::Wandering;
                self.heading = rng.random_range(0.0..TAU);
            },
        }
    }
}

/// Move an enemy along its heading, bouncing off the world edges.
pub fn steer(enemy: &mut Enemy, dt: f32, world: (f32, f32), tuning: &GameTuning) {
    let speed = if enemy.brain.is_fleeing() {
        enemy.growth.base_speed() * tuning.boost_multiplier.min(1.3)
    } else {
        enemy.growth.base_speed()
    };
    let r = enemy.growth.radius();
    let (dx, dy) = (enemy.brain.heading.cos(), enemy.brain.heading.sin());
    let nx = enemy.x + dx * speed * dt;
    let ny = enemy.y + dy * speed * dt;
    enemy.x = clamp_axis(nx, r, world.0);
    enemy.y = clamp_axis(ny, r, world.1);

    let hit_x = enemy.x != nx;
    let hit_y = enemy.y != ny;
    if hit_x || hit_y {
        let (mut hx, mut hy) = (dx, dy);
        if hit_x {
            hx = -hx;
        }
        if hit_y {
            hy = -hy;
        }
        enemy.brain.heading = hy.atan2(hx);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::entity::LocalPlayer;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn wanders_when_alone() {
        let t = GameTuning::default();
        let me = Enemy::new("e1", 500.0, 500.0, 2, &t);
        let mut brain = EnemyBrain::default();
        brain.think("e1", &me, &[], &t, &mut rng());
        assert_eq!(brain.mode, Mode::Wandering);
        assert!((t.think_min_ticks..=t.think_max_ticks).contains(&brain.timer));
    }

    #[test]
    fn hunts_edible_prey_in_range() {
        let t = GameTuning::default();
        let me = Enemy::new("e1", 500.0, 500.0, 4, &t);
        let prey = LocalPlayer::new("me", 700.0, 500.0, &t);
        let mut brain = EnemyBrain::default();
        brain.think("e1", &me, &[Entity::LocalPlayer(&prey)], &t, &mut rng());
        assert_eq!(
            brain.mode,
            Mode::Hunting {
                target: "local".to_string()
            }
        );
        assert!(brain.heading.abs() < 1e-5, "should head east toward prey");
    }

    #[test]
    fn ignores_prey_out_of_range() {
        let t = GameTuning::default();
        let me = Enemy::new("e1", 500.0, 500.0, 4, &t);
        let prey = LocalPlayer::new("me", 900.0, 500.0, &t);
        let mut brain = EnemyBrain::default();
        brain.think("e1", &me, &[Entity::LocalPlayer(&prey)], &t, &mut rng());
        assert_eq!(brain.mode, Mode::Wandering);
    }

    #[test]
    fn flee_overrides_hunting() {
        let t = GameTuning::default();
        let me = Enemy::new("e1", 500.0, 500.0, 3, &t);
        let prey = Enemy::new("e2", 600.0, 500.0, 1, &t);
        let shark = Enemy::new("e3", 400.0, 500.0, 8, &t);
        let mut brain = EnemyBrain::default();
        brain.think("e1", &me, &[Entity::Enemy(&prey)], &t, &mut rng());
        assert!(matches!(brain.mode, Mode::Hunting { .. }));

        brain.think(
            "e1",
            &me,
            &[Entity::Enemy(&prey), Entity::Enemy(&shark)],
            &t,
            &mut rng(),
        );
        assert_eq!(
            brain.mode,
            Mode::Fleeing {
                from: "e3".to_string()
            }
        );
        assert_eq!(brain.timer, t.flee_ticks);
        assert!(brain.heading.abs() < 1e-5, "should flee east, away from shark");
    }

    #[test]
    fn hunting_is_not_rerolled_before_timer_expires() {
        let t = GameTuning::default();
        let me = Enemy::new("e1", 500.0, 500.0, 4, &t);
        let prey = Enemy::new("e2", 600.0, 500.0, 1, &t);
        let other = Enemy::new("e4", 520.0, 500.0, 1, &t);
        let mut brain = EnemyBrain::default();
        brain.think("e1", &me, &[Entity::Enemy(&prey)], &t, &mut rng());
        // A closer prey appears, but the hunt is time-boxed.
        brain.think(
            "e1",
            &me,
            &[Entity::Enemy(&prey), Entity::Enemy(&other)],
            &t,
            &mut rng(),
        );
        assert_eq!(
            brain.mode,
            Mode::Hunting {
                target: "e2".to_string()
            }
        );
    }

    #[test]
    fn steer_bounces_off_edges() {
        let t = GameTuning::default();
        let mut e = Enemy::new("e1", 15.0, 500.0, 1, &t);
        e.brain.heading = std::f32::consts::PI;
        steer(&mut e, 0.1, (1000.0, 1000.0), &t);
        assert_eq!(e.x, e.growth.radius());
        assert!(e.brain.heading.cos() > 0.99);
    }
}
