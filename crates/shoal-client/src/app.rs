use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::MissedTickBehavior;

use shoal_core::config::GameTuning;
use shoal_core::net::sync::{ClientSync, ConnectionStatus};
use shoal_core::sim::{SimEvent, SimulationContext, World};

use crate::autopilot;
use crate::config::ClientConfig;
use crate::net_client::WsClient;

/// Log a status line every this many frames.
const STATUS_EVERY_FRAMES: u64 = 600;

/// Headless game: the simulation, its sync state and an optional connection.
pub struct ClientApp {
    pub world: World,
    pub ctx: SimulationContext,
    sync: ClientSync,
    client: Option<WsClient>,
    rng: StdRng,
    frames: u64,
    handshake_timeout_ms: f32,
    /// Time spent connecting without a `gameState`.
    handshake_waited_ms: f32,
}

impl ClientApp {
    /// A fresh offline game. Call [`ClientApp::connect`] to go online.
    pub fn new(config: &ClientConfig, tuning: GameTuning, mut rng: StdRng) -> Self {
        let ctx = SimulationContext::new(tuning, config.frame_dt());
        let mut world = World::new(&config.name, &ctx, &mut rng);
        let mut sync = ClientSync::new();
        sync.on_transport_error(&mut world, "not connected");
        Self {
            world,
            ctx,
            sync,
            client: None,
            rng,
            frames: 0,
            handshake_timeout_ms: config.handshake_timeout_ms as f32,
            handshake_waited_ms: 0.0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.sync.status()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Dial the server and announce the local fish. Failure leaves the
    /// game running offline.
    pub async fn connect(&mut self, config: &ClientConfig) {
        self.sync.connecting();
        self.handshake_timeout_ms = config.handshake_timeout_ms as f32;
        self.handshake_waited_ms = 0.0;
        let client = match WsClient::connect(&config.server_url, config.format).await {
            Ok(client) => client,
            Err(e) => {
                self.go_offline(&e.to_string());
                return;
            },
        };
        let join = ClientSync::join_event(&self.world, &self.ctx);
        match client.send(&join) {
            Ok(()) => self.client = Some(client),
            Err(e) => self.go_offline(&e.to_string()),
        }
    }

    fn go_offline(&mut self, reason: &str) {
        self.client = None;
        self.sync.on_transport_error(&mut self.world, reason);
    }

    /// One fixed step: apply server events, steer, simulate, report.
    pub fn frame(&mut self) -> Vec<SimEvent> {
        self.frames += 1;
        let mut events = Vec::new();

        let mut lost = false;
        if let Some(client) = &mut self.client {
            for event in client.drain_events() {
                events.extend(self.sync.apply(event, &mut self.world, &mut self.ctx));
            }
            lost = !client.is_connected();
        }
        if lost {
            self.go_offline("connection closed");
        } else if self.client.is_some() && self.sync.status() == ConnectionStatus::Connecting {
            self.handshake_waited_ms += self.ctx.dt * 1000.0;
            if self.handshake_waited_ms >= self.handshake_timeout_ms {
                self.go_offline("no game state from server");
            }
        }

        let plan = autopilot::plan(&self.world, &self.ctx);
        self.world.set_target(plan.target);
        self.world.set_boost(plan.boost);

        events.extend(self.world.step(&self.ctx, &mut self.rng));
        self.world.update_camera(&mut self.ctx);

        let dt_ms = self.ctx.dt * 1000.0;
        let outgoing = self.sync.outgoing(&events, &self.world, dt_ms);
        let mut failure = None;
        if let Some(client) = &self.client {
            for event in &outgoing {
                if let Err(e) = client.send(event) {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failure {
            self.go_offline(&e.to_string());
        }

        for event in &events {
            match event {
                SimEvent::LocalDied { by } => tracing::info!(by = %by, "Eaten"),
                SimEvent::LevelChanged { from, to } => {
                    tracing::info!(from, to, "Size level changed")
                },
                _ => tracing::trace!(?event, "Simulation event"),
            }
        }
        events
    }

    /// Drive frames at the configured rate until `max_frames` or Ctrl-C.
    pub async fn run(mut self, config: &ClientConfig) {
        let mut ticker = tokio::time::interval(Duration::from_secs_f32(config.frame_dt()));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = &mut ctrl_c => {
                    tracing::info!("Interrupted");
                    break;
                },
            }
            self.frame();

            if self.frames % STATUS_EVERY_FRAMES == 0 {
                let local = &self.world.local;
                tracing::info!(
                    status = ?self.status(),
                    level = local.growth.size_level(),
                    score = local.growth.score(),
                    peers = self.world.visible_peers(),
                    food = self.world.foods.len(),
                    "Status"
                );
            }
            if config.max_frames.is_some_and(|max| self.frames >= max) {
                break;
            }
        }
        tracing::info!(
            frames = self.frames,
            score = self.world.local.growth.score(),
            "Client stopped"
        );
    }
}

/// Seeded rng for reproducible runs, OS entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
