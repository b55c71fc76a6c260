//! Input source for the headless client: flee what can eat us, chase what
//! we can eat, otherwise graze on the nearest pellet.

use shoal_core::collision::can_eat;
use shoal_core::entity::Body;
use shoal_core::sim::{SimulationContext, World};

/// How far past our own position a flee target is placed.
const FLEE_LEAD: f32 = 250.0;

/// Steering decision for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub target: Option<(f32, f32)>,
    pub boost: bool,
}

impl Plan {
    const IDLE: Self = Self {
        target: None,
        boost: false,
    };
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Nearest body satisfying `keep`, with its distance.
fn nearest<'a, B, I, F>(from: (f32, f32), bodies: I, keep: F) -> Option<((f32, f32), f32)>
where
    B: Body + ?Sized + 'a,
    I: IntoIterator<Item = &'a B>,
    F: Fn(&B) -> bool,
{
    bodies
        .into_iter()
        .filter(|b| b.is_alive() && keep(*b))
        .map(|b| (b.position(), distance(from, b.position())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn closer(
    a: Option<((f32, f32), f32)>,
    b: Option<((f32, f32), f32)>,
) -> Option<((f32, f32), f32)> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y.1 < x.1 { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

pub fn plan(world: &World, ctx: &SimulationContext) -> Plan {
    let tuning = &ctx.tuning;
    let me = &world.local;
    if !me.alive {
        return Plan::IDLE;
    }
    let here = me.position();
    let threshold = tuning.eat_threshold;

    let threat = closer(
        nearest(here, &world.enemies, |e| can_eat(e, me, threshold)),
        nearest(here, world.remotes.values(), |r| can_eat(r, me, threshold)),
    );
    if let Some((at, dist)) = threat
        && dist < tuning.flee_radius
    {
        let (dx, dy) = (here.0 - at.0, here.1 - at.1);
        let len = dist.max(f32::EPSILON);
        // Boost only when it costs a level we can afford.
        let boost = dist < tuning.flee_radius / 2.0 && me.growth.size_level() > 1;
        return Plan {
            target: Some((here.0 + dx / len * FLEE_LEAD, here.1 + dy / len * FLEE_LEAD)),
            boost,
        };
    }

    let prey = closer(
        nearest(here, &world.enemies, |e| can_eat(me, e, threshold)),
        nearest(here, world.remotes.values(), |r| can_eat(me, r, threshold)),
    )
    .filter(|(_, dist)| *dist < tuning.hunt_radius);
    let food = nearest(here, world.foods.iter(), |_| true);

    match closer(prey, food) {
        Some((at, _)) => Plan {
            target: Some(at),
            boost: false,
        },
        None => Plan {
            target: Some((ctx.world.width / 2.0, ctx.world.height / 2.0)),
            boost: false,
        },
    }
}
