//! Guest side: apply host snapshots, send input every tick

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::{BotController, GUEST_ID, HOST_ID};
use crate::mapgen;
use crate::protocol::{
    GameOverPackage, InitPackage, Message, MessageCodec, PingPackage, StatePackage, StateReceiver,
};
use crate::transport::{TransportError, TransportEvent, TransportManager, TransportState};
use crate::util::time::{tick_delta, tick_duration, unix_millis};

/// How a client run ended
#[derive(Debug)]
pub enum ClientOutcome {
    Finished(GameOverPackage),
    /// Host closed the link before a result arrived
    HostLeft,
    Interrupted,
}

/// Check that the host's walls are what `seed` generates locally
pub fn verify_layout(init: &InitPackage) -> bool {
    let local = mapgen::generate(init.seed);
    local.walls == init.walls
}

pub struct ClientSession {
    transport: TransportManager,
    events: mpsc::Receiver<TransportEvent>,
    codec: MessageCodec,
    receiver: StateReceiver,
    bot: BotController,
    init: Option<InitPackage>,
    latest: Option<StatePackage>,
    outcome: Option<ClientOutcome>,
}

impl ClientSession {
    pub fn new(transport: TransportManager, events: mpsc::Receiver<TransportEvent>) -> Self {
        Self {
            transport,
            events,
            codec: MessageCodec::new(),
            receiver: StateReceiver::new(),
            bot: BotController::new(),
            init: None,
            latest: None,
            outcome: None,
        }
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<&StatePackage> {
        self.latest.as_ref()
    }

    /// Dial `remote` and play until the host reports a result
    pub async fn run<F>(mut self, remote: &str, shutdown: F) -> Result<ClientOutcome, TransportError>
    where
        F: Future<Output = ()>,
    {
        self.transport.connect(remote)?;
        info!(remote = %remote, "Client session started");

        let mut ticker = interval(tick_duration());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break Ok(ClientOutcome::Interrupted),
            }

            if let Err(e) = self.process_events() {
                break Err(e);
            }
            if let Some(outcome) = self.outcome.take() {
                break Ok(outcome);
            }
            self.send_input();
        };

        self.transport.destroy();
        info!(
            discarded_states = self.receiver.discarded(),
            stats = ?self.transport.stats(),
            "Client session stopped"
        );
        result
    }

    fn process_events(&mut self) -> Result<(), TransportError> {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event)?;
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> Result<(), TransportError> {
        match event {
            TransportEvent::Connected { peer } => info!(peer = %peer, "Connected to host"),
            TransportEvent::Frame(frame) => match self.codec.decode(frame) {
                Ok(envelope) => self.handle_message(envelope.seq, envelope.message),
                Err(e) => warn!(error = %e, "Dropping undecodable frame"),
            },
            TransportEvent::Disconnected => warn!("Lost host link"),
            TransportEvent::Reconnecting { attempt } => info!(attempt, "Redialing host"),
            TransportEvent::Closed => {
                info!("Host closed the link");
                self.outcome.get_or_insert(ClientOutcome::HostLeft);
            }
            TransportEvent::Error(e) => {
                warn!(error = %e, "Transport error");
                if self.transport.state() == TransportState::Failed {
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, seq: u64, message: Message) {
        match message {
            Message::Init(init) => {
                if verify_layout(&init) {
                    debug!(seed = init.seed, walls = init.walls.len(), "Arena layout verified");
                } else {
                    warn!(seed = init.seed, "Host walls differ from local generation, using host walls");
                }
                // A fresh Init means the host restarted the stream
                self.receiver = StateReceiver::new();
                self.init = Some(init);
            }
            Message::State(state) => {
                if self.receiver.accept(seq) {
                    self.latest = Some(state);
                } else {
                    debug!(seq, last = ?self.receiver.last_seq(), "Discarding stale state");
                }
            }
            Message::GameOver(over) => {
                info!(
                    winner = ?over.winner_id,
                    reason = ?over.reason,
                    duration_secs = over.duration_secs,
                    "Match over"
                );
                self.outcome = Some(ClientOutcome::Finished(over));
            }
            Message::Ping(ping) if !ping.echo => {
                self.send(&Message::Ping(PingPackage {
                    sent_at: ping.sent_at,
                    echo: true,
                }));
            }
            Message::Ping(ping) => {
                debug!(rtt_ms = unix_millis().saturating_sub(ping.sent_at), "Host round trip");
            }
            Message::Input(_) => debug!("Ignoring Input from host"),
        }
    }

    fn send_input(&mut self) {
        if self.init.is_none() {
            return;
        }
        let Some(state) = self.latest.as_ref() else {
            return;
        };
        let Some(me) = state.players.iter().find(|p| p.id() == GUEST_ID) else {
            return;
        };
        let target = state.players.iter().find(|p| p.id() == HOST_ID);
        let input = self.bot.think(me, target, tick_delta());
        self.send(&Message::Input(input));
    }

    fn send(&mut self, message: &Message) {
        match self.codec.encode(message) {
            Ok(text) => {
                self.transport.send(text);
            }
            Err(e) => warn!(error = %e, "Failed to encode outgoing message"),
        }
    }
}
