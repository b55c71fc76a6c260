pub mod collision;
pub mod config;
pub mod enemy;
pub mod entity;
pub mod growth;
pub mod net;
pub mod player;
pub mod pool;
pub mod sim;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::config::GameTuning;
    use crate::entity::LocalPlayer;
    use crate::growth::radius_for_level;
    use crate::net::messages::{JoinPayload, PlayerSnapshot, UpdatePayload};
    use crate::player::FishColors;
    use crate::sim::{SimulationContext, World};

    /// A live player snapshot at `(x, y)` with the radius matching `level`.
    pub fn make_snapshot(id: &str, x: f32, y: f32, level: u32) -> PlayerSnapshot {
        let colors = FishColors::default();
        PlayerSnapshot {
            id: id.to_string(),
            name: format!("Fish {id}"),
            x,
            y,
            radius: radius_for_level(level, &GameTuning::default()),
            angle: 0.0,
            score: 0,
            size_level: level,
            is_alive: true,
            color: colors.color,
            eye_color: colors.eye_color,
            pupil_color: colors.pupil_color,
        }
    }

    /// A level-1 `playerJoin` payload in a 3000x3000 world.
    pub fn make_join(name: &str) -> JoinPayload {
        let colors = FishColors::from_palette(1);
        JoinPayload {
            name: name.to_string(),
            x: 500.0,
            y: 500.0,
            radius: 15.0,
            color: colors.color,
            eye_color: colors.eye_color,
            pupil_color: colors.pupil_color,
            angle: 0.0,
            world_width: 3000.0,
            world_height: 3000.0,
        }
    }

    pub fn make_update(x: f32, y: f32, level: u32) -> UpdatePayload {
        UpdatePayload {
            x,
            y,
            radius: radius_for_level(level, &GameTuning::default()),
            angle: 0.0,
            score: 0,
            size_level: level,
            is_alive: true,
        }
    }

    /// An empty world (no enemies, no food) with the local fish at `(x, y)`.
    pub fn make_world(x: f32, y: f32) -> (World, SimulationContext) {
        let tuning = GameTuning {
            enemy_count: 0,
            ..GameTuning::default()
        };
        let ctx = SimulationContext::new(tuning, 1.0 / 60.0);
        let world = World::with_local(LocalPlayer::new("tester", x, y, &ctx.tuning));
        (world, ctx)
    }
}
