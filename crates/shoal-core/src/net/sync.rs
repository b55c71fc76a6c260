//! Client half of the sync contract: applies server events to the local
//! world and turns local simulation events into reports.

use crate::collision::kill_local;
use crate::entity::RemotePlayer;
use crate::net::messages::{ClientEvent, ConnectionId, JoinPayload, RespawnPayload, ServerEvent};
use crate::sim::{SimEvent, SimulationContext, World};

/// Report interval while other players are present.
pub const PEER_REPORT_INTERVAL_MS: f32 = 50.0;
/// Report interval when the client is effectively alone.
pub const SOLO_REPORT_INTERVAL_MS: f32 = 200.0;

/// Internal status signal consumed by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Online,
    Offline,
}

/// Rate limiter for `playerUpdate` reports.
#[derive(Debug, Clone, Default)]
pub struct ReportScheduler {
    elapsed_ms: f32,
}

impl ReportScheduler {
    pub fn interval_ms(peers: usize) -> f32 {
        if peers > 0 {
            PEER_REPORT_INTERVAL_MS
        } else {
            SOLO_REPORT_INTERVAL_MS
        }
    }

    /// Advance by `dt_ms`. Returns true when a report is due.
    pub fn tick(&mut self, dt_ms: f32, peers: usize) -> bool {
        if dt_ms.is_finite() && dt_ms > 0.0 {
            self.elapsed_ms += dt_ms;
        }
        if self.elapsed_ms >= Self::interval_ms(peers) {
            self.elapsed_ms = 0.0;
            return true;
        }
        false
    }

    /// Restart the interval after an out-of-band report.
    pub fn reset(&mut self) {
        self.elapsed_ms = 0.0;
    }
}

#[derive(Debug, Clone)]
pub struct ClientSync {
    status: ConnectionStatus,
    self_id: Option<ConnectionId>,
    reports: ReportScheduler,
}

impl Default for ClientSync {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSync {
    /// Starts offline; a driver calls [`ClientSync::connecting`] before dialing.
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Offline,
            self_id: None,
            reports: ReportScheduler::default(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    pub fn is_online(&self) -> bool {
        self.status == ConnectionStatus::Online
    }

    pub fn connecting(&mut self) {
        self.status = ConnectionStatus::Connecting;
    }

    /// The `playerJoin` announcing the local fish.
    pub fn join_event(world: &World, ctx: &SimulationContext) -> ClientEvent {
        let local = &world.local;
        ClientEvent::PlayerJoin(JoinPayload {
            name: local.name.clone(),
            x: local.x,
            y: local.y,
            radius: local.growth.radius(),
            color: local.colors.color.clone(),
            eye_color: local.colors.eye_color.clone(),
            pupil_color: local.colors.pupil_color.clone(),
            angle: local.angle,
            world_width: ctx.world.width,
            world_height: ctx.world.height,
        })
    }

    fn is_self(&self, id: &str) -> bool {
        self.self_id.as_deref() == Some(id)
    }

    /// Apply one server event to the world. Removals are idempotent and
    /// snapshots are last-wins. Returns local simulation events caused by
    /// the server (a remote kill of the local fish).
    pub fn apply(
        &mut self,
        event: ServerEvent,
        world: &mut World,
        ctx: &mut SimulationContext,
    ) -> Vec<SimEvent> {
        let mut events = Vec::new();
        match event {
            ServerEvent::GameState(state) => {
                tracing::info!(
                    self_id = %state.self_id,
                    players = state.players.len(),
                    foods = state.foods.len(),
                    "Received game state"
                );
                ctx.world.merge(state.world_width, state.world_height);
                world.local.id = state.self_id.clone();
                world.remotes = state
                    .players
                    .values()
                    .filter(|p| p.id != state.self_id)
                    .map(|p| (p.id.clone(), RemotePlayer::from_snapshot(p, &ctx.tuning)))
                    .collect();
                world.foods.replace_all(state.foods);
                world.set_offline_food(false);
                self.self_id = Some(state.self_id);
                self.status = ConnectionStatus::Online;
                self.reports.reset();
            },
            ServerEvent::PlayerJoined(snapshot)
            | ServerEvent::PlayerMoved(snapshot)
            | ServerEvent::PlayerRespawned(snapshot) => {
                if self.is_self(&snapshot.id) {
                    return events;
                }
                match world.remotes.get_mut(&snapshot.id) {
                    Some(remote) => remote.apply_snapshot(&snapshot, &ctx.tuning),
                    None => {
                        let remote = RemotePlayer::from_snapshot(&snapshot, &ctx.tuning);
                        world.remotes.insert(snapshot.id, remote);
                    },
                }
            },
            ServerEvent::PlayerLeft(id) => {
                if world.remotes.remove(&id).is_none() {
                    tracing::debug!(connection_id = %id, "Leave for unknown player ignored");
                }
            },
            ServerEvent::PlayerDied(id) => {
                if self.is_self(&id) {
                    kill_local(&mut world.local, "remote", &ctx.tuning, &mut events);
                } else if let Some(remote) = world.remotes.get_mut(&id) {
                    remote.alive = false;
                } else {
                    tracing::debug!(connection_id = %id, "Death of unknown player ignored");
                }
            },
            ServerEvent::FoodSpawned(food) => {
                world.foods.insert(food);
            },
            ServerEvent::FoodRemoved(id) => {
                world.foods.remove(&id);
            },
        }
        events
    }

    /// Translate simulation events into reports, plus a rate-limited
    /// `playerUpdate`. Nothing is produced unless online.
    pub fn outgoing(&mut self, events: &[SimEvent], world: &World, dt_ms: f32) -> Vec<ClientEvent> {
        if !self.is_online() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut force_update = false;
        for event in events {
            match event {
                SimEvent::FoodEaten(id) => out.push(ClientEvent::FoodEaten(id.clone())),
                SimEvent::PlayerEaten(id) => out.push(ClientEvent::PlayerEaten(id.clone())),
                SimEvent::LocalRespawned => {
                    let local = &world.local;
                    out.push(ClientEvent::PlayerRespawn(RespawnPayload {
                        x: local.x,
                        y: local.y,
                        radius: local.growth.radius(),
                        score: local.growth.score(),
                        size_level: local.growth.size_level(),
                    }));
                },
                SimEvent::LocalDied { .. } | SimEvent::LevelChanged { .. } => force_update = true,
                SimEvent::EnemyEaten(_) => {},
            }
        }

        if self.reports.tick(dt_ms, world.visible_peers()) || force_update {
            self.reports.reset();
            out.push(ClientEvent::PlayerUpdate(world.local.update_payload()));
        }
        out
    }

    /// Connection lost or never established: continue as a single-player game.
    pub fn on_transport_error(&mut self, world: &mut World, reason: &str) {
        if self.status != ConnectionStatus::Offline {
            tracing::warn!(reason, "Server unreachable, continuing offline");
        }
        self.status = ConnectionStatus::Offline;
        self.self_id = None;
        world.remotes.clear();
        world.local.id = "local".to_string();
        world.set_offline_food(true);
    }
}
