//! Connection registry, adaptive fan-out and the food spawn timer.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::extract::ws::Message;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

use shoal_core::net::messages::{
    ConnectionId, JoinPayload, RespawnPayload, ServerEvent, UpdatePayload,
};
use shoal_core::net::protocol::{WireFormat, encode_server_event};

use crate::authority::ServerAuthority;
use crate::config::ServerConfig;

/// Per-connection sender for outbound WebSocket frames. Bounded so a slow
/// client drops frames instead of growing memory.
pub type ConnectionSender = mpsc::Sender<Message>;

pub type SharedHub = Arc<RwLock<Hub>>;

struct Connection {
    sender: ConnectionSender,
    format: WireFormat,
}

/// One event encoded lazily, at most once per wire format.
struct Frames<'a> {
    event: &'a ServerEvent,
    json: Option<Option<Message>>,
    msgpack: Option<Option<Message>>,
}

impl<'a> Frames<'a> {
    fn new(event: &'a ServerEvent) -> Self {
        Self {
            event,
            json: None,
            msgpack: None,
        }
    }

    fn get(&mut self, format: WireFormat) -> Option<Message> {
        let event = self.event;
        let slot = match format {
            WireFormat::Json => &mut self.json,
            WireFormat::MsgPack => &mut self.msgpack,
        };
        slot.get_or_insert_with(|| encode_frame(format, event)).clone()
    }
}

/// Encode an event as a text (JSON) or binary (MessagePack) frame.
pub fn encode_frame(format: WireFormat, event: &ServerEvent) -> Option<Message> {
    match encode_server_event(format, event) {
        Ok(bytes) => match format {
            WireFormat::Json => match String::from_utf8(bytes) {
                Ok(text) => Some(Message::Text(text.into())),
                Err(e) => {
                    tracing::warn!(error = %e, "JSON encoder produced invalid UTF-8");
                    None
                },
            },
            WireFormat::MsgPack => Some(Message::Binary(bytes.into())),
        },
        Err(e) => {
            tracing::warn!(event = event.name(), error = %e, "Failed to encode server event");
            None
        },
    }
}

/// Snapshot of hub counters for the health endpoint.
#[derive(Debug, Clone, Copy)]
pub struct HubStats {
    pub connected_players: usize,
    pub food: usize,
    pub spawn_period: Option<Duration>,
}

pub struct Hub {
    authority: ServerAuthority,
    connections: HashMap<ConnectionId, Connection>,
    spawn_task: Option<JoinHandle<()>>,
    rng: StdRng,
    me: Weak<RwLock<Hub>>,
}

impl Drop for Hub {
    fn drop(&mut self) {
        if let Some(task) = self.spawn_task.take() {
            task.abort();
        }
    }
}

impl Hub {
    pub fn shared(config: &ServerConfig) -> SharedHub {
        let mut rng = StdRng::from_os_rng();
        let authority = ServerAuthority::new(config, &mut rng);
        Arc::new_cyclic(|me| {
            RwLock::new(Self {
                authority,
                connections: HashMap::new(),
                spawn_task: None,
                rng,
                me: me.clone(),
            })
        })
    }

    pub fn authority(&self) -> &ServerAuthority {
        &self.authority
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connected_players: self.authority.connected_players(),
            food: self.authority.food_count(),
            spawn_period: self.authority.spawn_period(),
        }
    }

    /// Register a connection. The joiner receives `gameState` before any
    /// other frame; peers hear `playerJoined` when there is an audience.
    pub fn join(
        &mut self,
        id: &str,
        join: JoinPayload,
        sender: ConnectionSender,
        format: WireFormat,
    ) {
        let state = self.authority.join(id, join);
        let snapshot = state.players.get(id).cloned();
        self.connections
            .insert(id.to_string(), Connection { sender, format });
        self.send_to(id, &ServerEvent::GameState(state));

        let connected = self.authority.connected_players();
        tracing::info!(connection_id = %id, connected, "Player joined");
        self.rebuild_spawn_timer();

        if ServerAuthority::should_broadcast(connected)
            && let Some(snapshot) = snapshot
        {
            self.broadcast_except(id, &ServerEvent::PlayerJoined(snapshot));
        }
    }

    pub fn update(&mut self, id: &str, update: &UpdatePayload) {
        let Some(snapshot) = self.authority.update_player(id, update) else {
            tracing::debug!(connection_id = %id, "Update from unregistered connection ignored");
            return;
        };
        if ServerAuthority::should_broadcast(self.authority.connected_players()) {
            self.broadcast_except(id, &ServerEvent::PlayerMoved(snapshot));
        }
    }

    pub fn food_eaten(&mut self, id: &str, food_id: &str) {
        if !self.authority.consume_food(food_id) {
            tracing::debug!(connection_id = %id, food_id, "Food already gone");
            return;
        }
        if ServerAuthority::should_broadcast(self.authority.connected_players()) {
            self.broadcast_except(id, &ServerEvent::FoodRemoved(food_id.to_string()));
        }
    }

    /// `id` reports having eaten `victim`. The victim is told too.
    pub fn player_eaten(&mut self, id: &str, victim: &str) {
        if !self.authority.mark_eaten(victim) {
            tracing::debug!(connection_id = %id, victim, "Eaten report for unknown or dead player");
            return;
        }
        if ServerAuthority::should_broadcast(self.authority.connected_players()) {
            self.broadcast_except(id, &ServerEvent::PlayerDied(victim.to_string()));
        }
    }

    pub fn respawn(&mut self, id: &str, respawn: &RespawnPayload) {
        let Some(snapshot) = self.authority.respawn(id, respawn) else {
            tracing::debug!(connection_id = %id, "Respawn from unregistered connection ignored");
            return;
        };
        if ServerAuthority::should_broadcast(self.authority.connected_players()) {
            self.broadcast_except(id, &ServerEvent::PlayerRespawned(snapshot));
        }
    }

    /// Drop a connection. The party size is judged before the removal so
    /// the last remaining player still hears about the leave.
    pub fn leave(&mut self, id: &str) {
        let before = self.authority.connected_players();
        self.connections.remove(id);
        if !self.authority.leave(id) {
            return;
        }
        let connected = self.authority.connected_players();
        tracing::info!(connection_id = %id, connected, "Player left");
        self.rebuild_spawn_timer();
        if ServerAuthority::should_broadcast(before) {
            self.broadcast_except(id, &ServerEvent::PlayerLeft(id.to_string()));
        }
    }

    /// One spawn-timer firing.
    pub fn spawn_tick(&mut self) {
        let Some(food) = self.authority.spawn_food(&mut self.rng) else {
            return;
        };
        if ServerAuthority::should_broadcast(self.authority.connected_players()) {
            self.broadcast(&ServerEvent::FoodSpawned(food));
        }
    }

    /// Cancel the running spawn timer and start one matching the current
    /// population (none when nobody is connected).
    fn rebuild_spawn_timer(&mut self) {
        if let Some(task) = self.spawn_task.take() {
            task.abort();
        }
        let Some(period) = self.authority.spawn_period() else {
            tracing::info!("Food spawning paused");
            return;
        };
        tracing::info!(period_ms = period.as_millis() as u64, "Food spawn timer rebuilt");

        let hub = self.me.clone();
        self.spawn_task = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(hub) = hub.upgrade() else {
                    break;
                };
                hub.write().await.spawn_tick();
            }
        }));
    }

    fn send_to(&self, id: &str, event: &ServerEvent) {
        let Some(conn) = self.connections.get(id) else {
            return;
        };
        if let Some(frame) = encode_frame(conn.format, event)
            && let Err(e) = conn.sender.try_send(frame)
        {
            tracing::debug!(
                connection_id = %id, error = %e,
                "Failed to send to connection (slow or disconnected)"
            );
        }
    }

    fn broadcast(&self, event: &ServerEvent) {
        self.fan_out(None, event);
    }

    fn broadcast_except(&self, exclude: &str, event: &ServerEvent) {
        self.fan_out(Some(exclude), event);
    }

    fn fan_out(&self, exclude: Option<&str>, event: &ServerEvent) {
        let mut frames = Frames::new(event);
        for (id, conn) in &self.connections {
            if exclude == Some(id.as_str()) {
                continue;
            }
            // An event too large in one framing may still fit in the other.
            let Some(frame) = frames.get(conn.format) else {
                continue;
            };
            if let Err(e) = conn.sender.try_send(frame) {
                tracing::debug!(
                    connection_id = %id, event = event.name(), error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }
}
