//! Pairwise edibility tests and predation outcomes.
//!
//! A single threshold (`GameTuning::eat_threshold`) governs every pair:
//! players, remote copies and enemies are all judged the same way.

use std::collections::HashMap;

use crate::config::GameTuning;
use crate::entity::{Body, Enemy, LocalPlayer, RemotePlayer};
use crate::net::messages::ConnectionId;
use crate::pool::FoodField;
use crate::sim::SimEvent;

/// Outcome of judging two overlapping bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The bodies do not touch (or one is dead).
    NoContact,
    FirstEats,
    SecondEats,
    /// Near-equal sizes: nothing happens, the bodies pass through.
    PassThrough,
}

/// Centers closer than the sum of radii. Dead bodies never collide.
pub fn overlaps<A: Body + ?Sized, B: Body + ?Sized>(a: &A, b: &B) -> bool {
    if !a.is_alive() || !b.is_alive() {
        return false;
    }
    let (ax, ay) = a.position();
    let (bx, by) = b.position();
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt() < a.radius() + b.radius()
}

/// `eater` may consume `prey` iff `eater.radius > prey.radius * threshold`.
pub fn can_eat<A: Body + ?Sized, B: Body + ?Sized>(eater: &A, prey: &B, threshold: f32) -> bool {
    eater.radius() > prey.radius() * threshold
}

pub fn judge<A: Body + ?Sized, B: Body + ?Sized>(a: &A, b: &B, threshold: f32) -> Verdict {
    if !overlaps(a, b) {
        Verdict::NoContact
    } else if can_eat(a, b, threshold) {
        Verdict::FirstEats
    } else if can_eat(b, a, threshold) {
        Verdict::SecondEats
    } else {
        Verdict::PassThrough
    }
}

/// Local player against every pellet it touches.
pub fn resolve_food(
    local: &mut LocalPlayer,
    foods: &mut FoodField,
    tuning: &GameTuning,
    events: &mut Vec<SimEvent>,
) {
    if !local.alive {
        return;
    }
    let eaten: Vec<String> = foods
        .iter()
        .filter(|f| overlaps(&*local, *f) && can_eat(&*local, *f, tuning.eat_threshold))
        .map(|f| f.id.clone())
        .collect();
    for id in eaten {
        if foods.remove(&id).is_some() {
            local.growth.eat(1.0, tuning);
            events.push(SimEvent::FoodEaten(id));
        }
    }
}

/// Local player against cached remote players.
pub fn resolve_remotes(
    local: &mut LocalPlayer,
    remotes: &mut HashMap<ConnectionId, RemotePlayer>,
    tuning: &GameTuning,
    events: &mut Vec<SimEvent>,
) {
    for remote in remotes.values_mut() {
        if !local.alive {
            return;
        }
        match judge(&*local, &*remote, tuning.eat_threshold) {
            Verdict::FirstEats => {
                remote.alive = false;
                local.growth.eat(remote.size_level as f32, tuning);
                events.push(SimEvent::PlayerEaten(remote.id.clone()));
            },
            Verdict::SecondEats => {
                kill_local(local, &remote.id, tuning, events);
            },
            Verdict::NoContact | Verdict::PassThrough => {},
        }
    }
}

/// Local player against enemies, then enemies against each other.
pub fn resolve_enemies(
    local: &mut LocalPlayer,
    enemies: &mut [Enemy],
    tuning: &GameTuning,
    events: &mut Vec<SimEvent>,
) {
    for enemy in enemies.iter_mut() {
        if !local.alive {
            break;
        }
        match judge(&*local, &*enemy, tuning.eat_threshold) {
            Verdict::FirstEats => {
                enemy.alive = false;
                local.growth.eat(enemy.growth.size_level() as f32, tuning);
                events.push(SimEvent::EnemyEaten(enemy.id.clone()));
            },
            Verdict::SecondEats => {
                enemy.growth.eat(local.growth.size_level() as f32, tuning);
                let by = enemy.id.clone();
                kill_local(local, &by, tuning, events);
            },
            Verdict::NoContact | Verdict::PassThrough => {},
        }
    }

    for i in 0..enemies.len() {
        for j in (i + 1)..enemies.len() {
            let (head, tail) = enemies.split_at_mut(j);
            let a = &mut head[i];
            let b = &mut tail[0];
            match judge(&*a, &*b, tuning.eat_threshold) {
                Verdict::FirstEats => {
                    b.alive = false;
                    a.growth.eat(b.growth.size_level() as f32, tuning);
                },
                Verdict::SecondEats => {
                    a.alive = false;
                    b.growth.eat(a.growth.size_level() as f32, tuning);
                },
                Verdict::NoContact | Verdict::PassThrough => {},
            }
        }
    }
}

/// Mark the local player dead and start its respawn countdown. The victim
/// gains and loses nothing here; the score penalty applies at respawn.
pub fn kill_local(
    local: &mut LocalPlayer,
    by: &str,
    tuning: &GameTuning,
    events: &mut Vec<SimEvent>,
) {
    if !local.alive {
        return;
    }
    local.alive = false;
    local.growth.stop_boost();
    local.respawn_in = tuning.respawn_ticks;
    events.push(SimEvent::LocalDied { by: by.to_string() });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::PlayerSnapshot;
    use crate::pool::Food;

    struct Disc {
        x: f32,
        y: f32,
        r: f32,
    }

    impl Body for Disc {
        fn position(&self) -> (f32, f32) {
            (self.x, self.y)
        }
        fn radius(&self) -> f32 {
            self.r
        }
    }

    fn disc(x: f32, r: f32) -> Disc {
        Disc { x, y: 0.0, r }
    }

    fn remote(id: &str, x: f32, y: f32, level: u32, t: &GameTuning) -> RemotePlayer {
        RemotePlayer::from_snapshot(
            &PlayerSnapshot {
                id: id.to_string(),
                name: id.to_string(),
                x,
                y,
                radius: 0.0,
                angle: 0.0,
                score: 0,
                size_level: level,
                is_alive: true,
                color: String::new(),
                eye_color: String::new(),
                pupil_color: String::new(),
            },
            t,
        )
    }

    #[test]
    fn threshold_scenario() {
        let a = disc(0.0, 30.0);
        let b = disc(1.0, 29.0);
        assert!(!can_eat(&a, &b, 1.05));
        assert!(can_eat(&a, &b, 0.99));
        assert_eq!(judge(&a, &b, 1.05), Verdict::PassThrough);
        assert_eq!(judge(&a, &b, 0.99), Verdict::FirstEats);
        assert_eq!(judge(&b, &a, 0.99), Verdict::SecondEats);
    }

    #[test]
    fn touching_is_not_overlapping() {
        assert!(!overlaps(&disc(0.0, 10.0), &disc(20.0, 10.0)));
        assert!(overlaps(&disc(0.0, 10.0), &disc(19.9, 10.0)));
        assert_eq!(
            judge(&disc(0.0, 50.0), &disc(200.0, 5.0), 1.05),
            Verdict::NoContact
        );
    }

    #[test]
    fn local_eats_touched_food_once() {
        let t = GameTuning::default();
        let mut local = LocalPlayer::new("me", 100.0, 100.0, &t);
        let mut foods = FoodField::new();
        foods.insert(Food {
            id: "food-1".to_string(),
            x: 110.0,
            y: 100.0,
            radius: 5.0,
            color: String::new(),
        });
        foods.insert(Food {
            id: "food-2".to_string(),
            x: 900.0,
            y: 900.0,
            radius: 5.0,
            color: String::new(),
        });
        let mut events = Vec::new();
        resolve_food(&mut local, &mut foods, &t, &mut events);
        resolve_food(&mut local, &mut foods, &t, &mut events);

        assert_eq!(events, vec![SimEvent::FoodEaten("food-1".to_string())]);
        assert_eq!(foods.len(), 1);
        assert_eq!(local.growth.score(), 10);
    }

    #[test]
    fn local_eats_smaller_remote_scaled_by_level() {
        let t = GameTuning::default();
        let mut local = LocalPlayer::new("me", 0.0, 0.0, &t);
        local.growth = crate::growth::GrowthState::from_level(4, &t);
        let mut remotes = HashMap::new();
        remotes.insert("peer".to_string(), remote("peer", 10.0, 0.0, 2, &t));
        let mut events = Vec::new();

        resolve_remotes(&mut local, &mut remotes, &t, &mut events);

        assert_eq!(events, vec![SimEvent::PlayerEaten("peer".to_string())]);
        assert!(!remotes["peer"].alive);
        // 2 units * 10 * level 4
        assert_eq!(local.growth.score(), 80);
    }

    #[test]
    fn bigger_remote_kills_local_without_reward_change() {
        let t = GameTuning::default();
        let mut local = LocalPlayer::new("me", 0.0, 0.0, &t);
        let mut remotes = HashMap::new();
        remotes.insert("shark".to_string(), remote("shark", 5.0, 0.0, 5, &t));
        let mut events = Vec::new();

        resolve_remotes(&mut local, &mut remotes, &t, &mut events);

        assert!(!local.alive);
        assert_eq!(local.respawn_in, t.respawn_ticks);
        assert_eq!(local.growth.score(), 0);
        assert_eq!(
            events,
            vec![SimEvent::LocalDied {
                by: "shark".to_string()
            }]
        );
    }

    #[test]
    fn equal_sizes_pass_through() {
        let t = GameTuning::default();
        let mut local = LocalPlayer::new("me", 0.0, 0.0, &t);
        let mut remotes = HashMap::new();
        remotes.insert("twin".to_string(), remote("twin", 1.0, 0.0, 1, &t));
        let mut events = Vec::new();
        resolve_remotes(&mut local, &mut remotes, &t, &mut events);
        assert!(events.is_empty());
        assert!(local.alive);
        assert!(remotes["twin"].alive);
    }

    #[test]
    fn enemies_eat_each_other() {
        let t = GameTuning::default();
        let mut local = LocalPlayer::new("me", 2000.0, 2000.0, &t);
        let mut enemies = vec![
            Enemy::new("small", 0.0, 0.0, 1, &t),
            Enemy::new("big", 5.0, 0.0, 3, &t),
        ];
        let mut events = Vec::new();
        resolve_enemies(&mut local, &mut enemies, &t, &mut events);
        assert!(!enemies[0].alive);
        assert!(enemies[1].alive);
        assert!(events.is_empty());
    }

    #[test]
    fn enemy_eats_local() {
        let t = GameTuning::default();
        let mut local = LocalPlayer::new("me", 0.0, 0.0, &t);
        let mut enemies = vec![Enemy::new("big", 3.0, 0.0, 4, &t)];
        let mut events = Vec::new();
        resolve_enemies(&mut local, &mut enemies, &t, &mut events);
        assert!(!local.alive);
        assert_eq!(
            events,
            vec![SimEvent::LocalDied {
                by: "big".to_string()
            }]
        );
    }
}
