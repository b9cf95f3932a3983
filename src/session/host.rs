//! Host tick driver
//!
//! Owns the authoritative `World`. Transport events are drained only at the
//! tick boundary, so the world has exactly one writer and never sees a
//! message mid-tick.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::{BotController, InputBuffer, World, WorldConfig, BOT_ID, GUEST_ID, HOST_ID};
use crate::mapgen;
use crate::protocol::{GameOverPackage, InputPackage, Message, MessageCodec, PingPackage};
use crate::transport::{TransportError, TransportEvent, TransportManager};
use crate::util::time::{tick_delta, tick_duration, unix_millis, SIMULATION_TPS};

/// Host pings the peer this often
const PING_INTERVAL_TICKS: u64 = SIMULATION_TPS as u64;
/// Progress log cadence
const STATUS_LOG_TICKS: u64 = SIMULATION_TPS as u64 * 5;

/// Where the second participant's input comes from
pub enum Opponent {
    /// A remote client over the transport
    Remote {
        transport: TransportManager,
        events: mpsc::Receiver<TransportEvent>,
    },
    /// A local bot; no transport at all
    Bot,
}

/// Authoritative match driver
pub struct HostSession {
    world: World,
    inputs: InputBuffer,
    codec: MessageCodec,
    opponent: Opponent,
    /// Drives the host's own player until a local input layer takes over
    local_bot: Option<BotController>,
    guest_bot: Option<BotController>,
    peer_connected: bool,
    started: bool,
    forfeit: bool,
}

impl HostSession {
    pub fn new(seed: u64, match_secs: f32, opponent: Opponent) -> Self {
        let is_bot = matches!(opponent, Opponent::Bot);
        let layout = mapgen::generate(seed);
        let world = World::new(
            &layout,
            WorldConfig {
                match_secs,
                guest_is_bot: is_bot,
            },
        );

        Self {
            world,
            inputs: InputBuffer::new(),
            codec: MessageCodec::new(),
            opponent,
            local_bot: Some(BotController::new()),
            guest_bot: is_bot.then(BotController::new),
            peer_connected: false,
            started: is_bot,
            forfeit: false,
        }
    }

    #[cfg(test)]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Input for the host's own player from a local input layer. The fallback
    /// bot stops driving the host from the first call on.
    #[allow(dead_code)]
    pub fn record_local_input(&mut self, input: &InputPackage) {
        if self.local_bot.take().is_some() {
            info!("Local input attached, host bot disengaged");
        }
        self.inputs.record(HOST_ID, input);
    }

    fn guest_id(&self) -> &'static str {
        if self.guest_bot.is_some() {
            BOT_ID
        } else {
            GUEST_ID
        }
    }

    /// Run until the match ends or `shutdown` resolves
    pub async fn run<F>(mut self, shutdown: F) -> Option<GameOverPackage>
    where
        F: Future<Output = ()>,
    {
        info!(seed = self.world.seed, started = self.started, "Host session started");

        let mut ticker = interval(tick_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping tick driver");
                    break None;
                }
            }

            self.process_events();
            if let Some(over) = self.step() {
                break Some(over);
            }
        };

        self.teardown();
        outcome
    }

    /// One tick boundary: feed bots, advance the world, publish state
    pub fn step(&mut self) -> Option<GameOverPackage> {
        if self.forfeit {
            self.forfeit = false;
            let over = self.world.forfeit(self.guest_id());
            if let Some(over) = &over {
                self.broadcast(&Message::GameOver(over.clone()));
            }
            return over;
        }
        if !self.started {
            return None;
        }

        let dt = tick_delta();
        if let Some(bot) = self.local_bot.as_mut() {
            let input = bot.think(&self.world.players[0], Some(&self.world.players[1]), dt);
            self.inputs.record(HOST_ID, &input);
        }
        if let Some(bot) = self.guest_bot.as_mut() {
            let input = bot.think(&self.world.players[1], Some(&self.world.players[0]), dt);
            self.inputs.record(BOT_ID, &input);
        }

        let over = self.world.tick(&self.inputs);
        self.broadcast(&Message::State(self.world.snapshot()));

        let tick = self.world.tick;
        if tick % PING_INTERVAL_TICKS == 0 {
            self.broadcast(&Message::Ping(PingPackage {
                sent_at: unix_millis(),
                echo: false,
            }));
        }
        if tick % STATUS_LOG_TICKS == 0 {
            info!(
                tick,
                host_hp = self.world.host().hp,
                guest_hp = self.world.guest().hp,
                bullets = self.world.bullets.len(),
                zone_radius = self.world.zone.radius,
                time_remaining = self.world.time_remaining(),
                "Match status"
            );
        }

        if let Some(over) = &over {
            self.broadcast(&Message::GameOver(over.clone()));
        }
        over
    }

    /// Drain every pending transport event without blocking
    fn process_events(&mut self) {
        loop {
            let event = match &mut self.opponent {
                Opponent::Remote { events, .. } => match events.try_recv() {
                    Ok(event) => event,
                    Err(_) => return,
                },
                Opponent::Bot => return,
            };
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { peer } => {
                info!(peer = %peer, "Peer connected, sending Init");
                self.peer_connected = true;
                self.started = true;
                self.broadcast(&Message::Init(self.world.init_package()));
            }
            TransportEvent::Frame(frame) => match self.codec.decode(frame) {
                Ok(envelope) => self.handle_message(envelope.message),
                Err(e) => warn!(error = %e, "Dropping undecodable frame"),
            },
            TransportEvent::Disconnected => {
                warn!("Peer dropped, holding the match open");
                self.peer_connected = false;
                self.inputs.clear(GUEST_ID);
            }
            TransportEvent::Reconnecting { attempt } => {
                debug!(attempt, "Waiting for peer to return");
            }
            TransportEvent::Closed => {
                info!("Peer closed the link");
                self.peer_connected = false;
                self.forfeit = self.started;
            }
            TransportEvent::Error(e) => {
                warn!(error = %e, "Transport error");
                if matches!(e, TransportError::ReconnectFailed { .. }) {
                    self.peer_connected = false;
                    self.forfeit = self.started;
                }
            }
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Input(input) => self.inputs.record(GUEST_ID, &input),
            Message::Ping(ping) if !ping.echo => {
                self.broadcast(&Message::Ping(PingPackage {
                    sent_at: ping.sent_at,
                    echo: true,
                }));
            }
            Message::Ping(ping) => {
                let rtt_ms = unix_millis().saturating_sub(ping.sent_at);
                debug!(rtt_ms, "Peer round trip");
            }
            other => debug!(kind = ?other.kind(), "Ignoring message the host does not consume"),
        }
    }

    /// Encode and hand to the transport; fire-and-forget
    fn broadcast(&mut self, message: &Message) {
        let Opponent::Remote { transport, .. } = &self.opponent else {
            return;
        };
        if !self.peer_connected {
            return;
        }
        match self.codec.encode(message) {
            Ok(text) => {
                transport.send(text);
            }
            Err(e) => warn!(error = %e, "Failed to encode outgoing message"),
        }
    }

    fn teardown(&mut self) {
        if let Opponent::Remote { transport, .. } = &self.opponent {
            transport.destroy();
            info!(stats = ?transport.stats(), "Guest link closed");
        }
        info!(ticks = self.world.tick, "Host session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::math::Vector2;
    use crate::protocol::messages::MessageType;
    use crate::protocol::{Frame, GameOverReason};
    use std::net::SocketAddr;

    fn remote_session() -> HostSession {
        let (transport, events) = TransportManager::new(SocketAddr::from(([127, 0, 0, 1], 0)));
        HostSession::new(11, 60.0, Opponent::Remote { transport, events })
    }

    fn idle_input(movement: Vector2) -> InputPackage {
        InputPackage {
            movement,
            aim: Vector2::new(1.0, 0.0),
            fire: false,
            sprint: false,
            dash: false,
            angle: 0.0,
        }
    }

    fn input_frame(movement: Vector2) -> Frame {
        let input = idle_input(movement);
        Frame {
            kind: MessageType::Input,
            payload: serde_json::to_value(input).unwrap(),
            timestamp: 1,
            seq: 1,
        }
    }

    #[test]
    fn waits_for_peer_before_ticking() {
        let mut session = remote_session();
        assert!(session.step().is_none());
        assert_eq!(session.world().tick, 0);

        session.handle_event(TransportEvent::Connected {
            peer: "guest".to_string(),
        });
        session.step();
        assert_eq!(session.world().tick, 1);
    }

    #[test]
    fn input_frames_land_in_the_buffer() {
        let mut session = remote_session();
        session.handle_event(TransportEvent::Connected {
            peer: "guest".to_string(),
        });
        session.handle_event(TransportEvent::Frame(input_frame(Vector2::new(1.0, 0.0))));
        session.step();
        assert!(session.world().guest().velocity.x > 0.0);
    }

    #[test]
    fn local_input_replaces_the_host_bot() {
        let mut session = HostSession::new(3, 60.0, Opponent::Bot);
        session.record_local_input(&idle_input(Vector2::ZERO));
        let start = session.world().host().position();

        for _ in 0..10 {
            session.step();
            assert_eq!(session.world().host().velocity, Vector2::ZERO);
        }
        assert_eq!(session.world().host().position(), start);
        assert_eq!(session.world().host().stats.shots_fired, 0);
    }

    #[test]
    fn bad_payload_is_dropped_without_side_effects() {
        let mut session = remote_session();
        session.handle_event(TransportEvent::Connected {
            peer: "guest".to_string(),
        });
        let mut frame = input_frame(Vector2::ZERO);
        frame.payload = serde_json::json!({ "move": "left" });
        session.handle_event(TransportEvent::Frame(frame));
        assert!(session.step().is_none());
    }

    #[test]
    fn peer_close_forfeits_the_match() {
        let mut session = remote_session();
        session.handle_event(TransportEvent::Connected {
            peer: "guest".to_string(),
        });
        session.step();
        session.handle_event(TransportEvent::Closed);
        let over = session.step().expect("forfeit ends the match");
        assert_eq!(over.reason, GameOverReason::Forfeit);
        assert_eq!(over.winner_id.as_deref(), Some(HOST_ID));
    }

    #[tokio::test]
    async fn practice_match_runs_to_completion() {
        let session = HostSession::new(3, 1.0, Opponent::Bot);
        let over = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            session.run(std::future::pending()),
        )
        .await
        .expect("practice match should finish")
        .expect("match should produce an outcome");
        assert!(over.duration_secs > 0.0);
        assert_eq!(over.players.len(), 2);
    }

    #[tokio::test]
    async fn shutdown_stops_the_driver() {
        let session = HostSession::new(3, 60.0, Opponent::Bot);
        let outcome = session.run(async {}).await;
        assert!(outcome.is_none());
    }
}
