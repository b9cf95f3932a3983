//! Peer connection lifecycle
//!
//! A `TransportManager` owns at most one peer link. The host side listens
//! (axum WebSocket upgrade on `/ws`), the client side dials
//! (tokio-tungstenite). Both feed the same link pump, which validates frames
//! and hands them to the consumer on an mpsc channel. Sends are
//! fire-and-forget: nothing is queued while the link is down.

mod dialer;
mod link;
mod listener;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::Frame;

/// Bound on binding the local endpoint
pub const INIT_TIMEOUT: Duration = Duration::from_secs(5);
/// Bound on one dial attempt
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Dial attempts after an implicit disconnect before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// First reconnect delay; doubles per attempt
#[cfg(not(test))]
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(250);
#[cfg(test)]
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(20);
/// How long a listener waits for a dropped peer to come back
#[cfg(not(test))]
pub const RECONNECT_WINDOW: Duration = Duration::from_secs(10);
#[cfg(test)]
pub const RECONNECT_WINDOW: Duration = Duration::from_millis(1000);

const TEARDOWN_GRACE: Duration = Duration::from_millis(500);
const EVENT_BUFFER: usize = 1024;
const OUTBOUND_BUFFER: usize = 64;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Idle,
    Initializing,
    /// Local endpoint ready (listening, or socket open while dialing)
    Open,
    /// Peer link up; the only state in which `send` transmits
    Connected,
    Reconnecting,
    Failed,
    Closed,
}

/// Transport errors. None of these are fatal to the process.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Timed out initializing the local endpoint")]
    InitTimeout,

    #[error("Failed to bind local endpoint: {0}")]
    Bind(String),

    #[error("Transport already initialized")]
    AlreadyInitialized,

    #[error("Invalid remote peer id: {0:?}")]
    InvalidRemoteId(String),

    #[error("Timed out connecting to peer")]
    ConnectTimeout,

    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectFailed { attempts: u32 },

    #[error("Transport is closed")]
    Closed,
}

/// Human-shareable peer identity: `ROOMCODE@host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerId {
    pub room: String,
    pub addr: SocketAddr,
}

impl PeerId {
    pub fn new(room: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            room: room.into(),
            addr,
        }
    }

    /// Fresh 8-character room code
    pub fn generate_room() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    }

    pub(crate) fn ws_url(&self) -> String {
        format!("ws://{}/ws?room={}", self.addr, self.room)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.room, self.addr)
    }
}

impl FromStr for PeerId {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidRemoteId(s.to_string());
        let trimmed = s.trim();
        let (room, addr) = trimmed.split_once('@').ok_or_else(invalid)?;
        if room.is_empty() || !room.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        let addr = addr.parse().map_err(|_| invalid())?;
        Ok(Self::new(room.to_uppercase(), addr))
    }
}

/// Notifications to the transport consumer
#[derive(Debug)]
pub enum TransportEvent {
    /// Peer link established (or re-established)
    Connected { peer: String },
    /// A structurally valid frame arrived
    Frame(Frame),
    /// Link dropped without a close frame
    Disconnected,
    Reconnecting { attempt: u32 },
    /// Link closed explicitly by either side
    Closed,
    Error(TransportError),
}

/// Link counters
#[derive(Debug, Default)]
pub struct TransportStats {
    sent: AtomicU64,
    dropped: AtomicU64,
    received: AtomicU64,
    malformed: AtomicU64,
    rate_limited: AtomicU64,
}

/// Point-in-time copy of [`TransportStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub sent: u64,
    pub dropped: u64,
    pub received: u64,
    pub malformed: u64,
    pub rate_limited: u64,
}

impl TransportStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the manager and its background tasks
pub(crate) struct Shared {
    state: RwLock<TransportState>,
    link: Mutex<Option<mpsc::Sender<String>>>,
    /// Bumped for every installed link
    generation: AtomicU64,
    local_id: RwLock<Option<PeerId>>,
    events: mpsc::Sender<TransportEvent>,
    stats: TransportStats,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    fn new(events: mpsc::Sender<TransportEvent>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: RwLock::new(TransportState::Idle),
            link: Mutex::new(None),
            generation: AtomicU64::new(0),
            local_id: RwLock::new(None),
            events,
            stats: TransportStats::default(),
            shutdown,
        }
    }

    pub(crate) fn state(&self) -> TransportState {
        *self.state.read()
    }

    pub(crate) fn set_state(&self, next: TransportState) {
        let prev = std::mem::replace(&mut *self.state.write(), next);
        if prev != next {
            debug!(from = ?prev, to = ?next, "Transport state changed");
        }
    }

    /// Move to `next` unless the transport was closed in the meantime.
    /// `Failed` only moves on to `Closed`; leaving it otherwise takes an
    /// explicit `connect`.
    pub(crate) fn advance(&self, next: TransportState) -> bool {
        let mut state = self.state.write();
        match *state {
            TransportState::Closed => return false,
            TransportState::Failed if next != TransportState::Closed => return false,
            _ => {}
        }
        if *state != next {
            debug!(from = ?*state, to = ?next, "Transport state changed");
            *state = next;
        }
        true
    }

    pub(crate) fn emit(&self, event: TransportEvent) {
        if let Err(e) = self.events.try_send(event) {
            warn!(error = %e, "Transport event dropped");
        }
    }

    /// Register the outbound half of a new link and return its generation.
    /// Fails if one is active.
    pub(crate) fn install_link(&self, outbound: mpsc::Sender<String>) -> Option<u64> {
        let mut link = self.link.lock();
        if link.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return None;
        }
        *link = Some(outbound);
        Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Enter `Reconnecting` for the dropped link `generation`, unless a newer
    /// link already took over or the transport is finished
    pub(crate) fn begin_reconnect(&self, generation: u64) -> bool {
        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != generation
            || matches!(*state, TransportState::Closed | TransportState::Failed)
        {
            return false;
        }
        if *state != TransportState::Reconnecting {
            debug!(from = ?*state, generation, "Transport state changed to Reconnecting");
            *state = TransportState::Reconnecting;
        }
        true
    }

    /// Fail the reconnect window opened for `generation`. No-op once a newer
    /// link was installed.
    pub(crate) fn expire_window(&self, generation: u64) -> bool {
        let mut state = self.state.write();
        if *state != TransportState::Reconnecting
            || self.generation.load(Ordering::SeqCst) != generation
        {
            return false;
        }
        *state = TransportState::Failed;
        true
    }

    pub(crate) fn has_link(&self) -> bool {
        self.link.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub(crate) fn clear_link(&self) {
        self.link.lock().take();
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub(crate) fn stats(&self) -> &TransportStats {
        &self.stats
    }

    pub(crate) fn local_room(&self) -> Option<String> {
        self.local_id.read().as_ref().map(|id| id.room.clone())
    }
}

/// Owns the peer link for one participant
pub struct TransportManager {
    shared: Arc<Shared>,
    bind_addr: SocketAddr,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TransportManager {
    /// Create a manager and the receiver for its events. `bind_addr` is only
    /// used by [`initialize`](Self::initialize).
    pub fn new(bind_addr: SocketAddr) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let manager = Self {
            shared: Arc::new(Shared::new(events_tx)),
            bind_addr,
            tasks: Mutex::new(Vec::new()),
        };
        (manager, events_rx)
    }

    pub fn state(&self) -> TransportState {
        self.shared.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats().snapshot()
    }

    #[cfg(test)]
    pub fn local_id(&self) -> Option<PeerId> {
        self.shared.local_id.read().clone()
    }

    /// Bind the local endpoint and start accepting a peer. `local_id` is the
    /// room code to use; one is generated when absent.
    pub async fn initialize(&self, local_id: Option<String>) -> Result<PeerId, TransportError> {
        match self.state() {
            TransportState::Idle => {}
            TransportState::Closed => return Err(TransportError::Closed),
            _ => return Err(TransportError::AlreadyInitialized),
        }
        self.shared.set_state(TransportState::Initializing);

        let listener = match tokio::time::timeout(INIT_TIMEOUT, TcpListener::bind(self.bind_addr)).await {
            Ok(Ok(listener)) => listener,
            Ok(Err(e)) => {
                self.shared.set_state(TransportState::Failed);
                return Err(TransportError::Bind(e.to_string()));
            }
            Err(_) => {
                self.shared.set_state(TransportState::Failed);
                return Err(TransportError::InitTimeout);
            }
        };
        let addr = listener.local_addr().map_err(|e| {
            self.shared.set_state(TransportState::Failed);
            TransportError::Bind(e.to_string())
        })?;

        let room = local_id
            .map(|id| id.trim().to_uppercase())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(PeerId::generate_room);
        let peer_id = PeerId::new(room, addr);
        *self.shared.local_id.write() = Some(peer_id.clone());

        let task = tokio::spawn(listener::serve(self.shared.clone(), listener));
        self.tasks.lock().push(task);

        if !self.shared.advance(TransportState::Open) {
            return Err(TransportError::Closed);
        }
        info!(peer_id = %peer_id, "Transport listening");
        Ok(peer_id)
    }

    /// Start dialing `remote`. Returns immediately; the outcome arrives as a
    /// [`TransportEvent`].
    pub fn connect(&self, remote: &str) -> Result<(), TransportError> {
        if remote.trim().is_empty() {
            return Err(TransportError::InvalidRemoteId(remote.to_string()));
        }
        let peer: PeerId = remote.parse()?;

        match self.state() {
            TransportState::Closed => return Err(TransportError::Closed),
            TransportState::Connected | TransportState::Reconnecting => {
                return Err(TransportError::AlreadyInitialized)
            }
            TransportState::Idle | TransportState::Failed => {
                self.shared.set_state(TransportState::Initializing)
            }
            TransportState::Initializing | TransportState::Open => {}
        }

        info!(peer = %peer, "Dialing peer");
        let task = tokio::spawn(dialer::run(self.shared.clone(), peer));
        self.tasks.lock().push(task);
        Ok(())
    }

    /// Send one encoded frame. Only transmits while `Connected`; otherwise the
    /// frame is dropped. Never blocks. Returns whether the frame was handed to
    /// the link.
    pub fn send(&self, text: String) -> bool {
        let state = self.state();
        if state != TransportState::Connected {
            self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(state = ?state, "Send while not connected, dropping frame");
            return false;
        }

        let outbound = self.shared.link.lock().clone();
        let Some(outbound) = outbound else {
            self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("No active link, dropping frame");
            return false;
        };

        match outbound.try_send(text) {
            Ok(()) => {
                self.shared.stats.sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Outbound link full or closed, dropping frame");
                false
            }
        }
    }

    /// Tear down the link and background tasks. Safe to call repeatedly and
    /// on a never-initialized manager.
    pub fn destroy(&self) {
        if self.shared.is_shut_down() {
            return;
        }
        self.shared.set_state(TransportState::Closed);
        self.shared.shutdown.send_replace(true);
        // Dropping the outbound sender lets the writer close the socket
        self.shared.clear_link();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        let runtime = tokio::runtime::Handle::try_current().ok();
        for task in tasks.into_iter().filter(|t| !t.is_finished()) {
            match &runtime {
                // Give the link a moment to flush its close frame
                Some(handle) => {
                    let abort = task.abort_handle();
                    handle.spawn(async move {
                        if tokio::time::timeout(TEARDOWN_GRACE, task).await.is_err() {
                            debug!("Transport task did not stop in time, aborting");
                            abort.abort();
                        }
                    });
                }
                None => task.abort(),
            }
        }
        info!("Transport destroyed");
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
        self.shared.clear_link();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;
    use tokio_test::assert_ok;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    const PING: &str = r#"{"type":"Ping","payload":{"sentAt":1},"timestamp":1,"seq":1}"#;

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    /// Next event matching `pred`, skipping others
    async fn wait_for<F>(rx: &mut mpsc::Receiver<TransportEvent>, mut pred: F) -> TransportEvent
    where
        F: FnMut(&TransportEvent) -> bool,
    {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                match rx.recv().await {
                    Some(event) if pred(&event) => return event,
                    Some(_) => continue,
                    None => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for transport event")
    }

    async fn connected_pair() -> (
        TransportManager,
        mpsc::Receiver<TransportEvent>,
        TransportManager,
        mpsc::Receiver<TransportEvent>,
    ) {
        let (host, mut host_rx) = TransportManager::new(loopback());
        let peer_id = assert_ok!(host.initialize(Some("testroom".to_string())).await);
        assert_eq!(peer_id.room, "TESTROOM");
        assert_eq!(host.state(), TransportState::Open);

        let (client, mut client_rx) = TransportManager::new(loopback());
        assert_ok!(client.connect(&peer_id.to_string()));

        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        wait_for(&mut client_rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        (host, host_rx, client, client_rx)
    }

    /// Bare WebSocket endpoint that accepts one socket without room checks
    async fn raw_accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (tcp, _) = assert_ok!(listener.accept().await);
        assert_ok!(tokio_tungstenite::accept_async(tcp).await)
    }

    async fn raw_dial(peer: &PeerId) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
        let (socket, _) = assert_ok!(tokio_tungstenite::connect_async(peer.ws_url()).await);
        socket
    }

    fn assert_no_errors(rx: &mut mpsc::Receiver<TransportEvent>) {
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, TransportEvent::Error(_)), "unexpected {event:?}");
        }
    }

    #[test]
    fn peer_id_round_trips_through_display() {
        let id = PeerId::new("AB12CD34", SocketAddr::from(([10, 0, 0, 2], 7777)));
        assert_eq!(id.to_string(), "AB12CD34@10.0.0.2:7777");
        assert_eq!(id.to_string().parse::<PeerId>().unwrap(), id);
        assert_eq!(PeerId::generate_room().len(), 8);
    }

    #[test]
    fn malformed_peer_ids_are_rejected() {
        for bad in ["", "   ", "ROOM", "@127.0.0.1:1", "ROOM@nowhere", "R O@127.0.0.1:1"] {
            assert!(
                matches!(bad.parse::<PeerId>(), Err(TransportError::InvalidRemoteId(_))),
                "{bad:?} should be invalid"
            );
        }
    }

    #[tokio::test]
    async fn send_before_open_is_dropped() {
        let (manager, _rx) = TransportManager::new(loopback());
        assert!(!manager.send(PING.to_string()));
        assert_eq!(manager.stats().dropped, 1);
        assert_eq!(manager.stats().sent, 0);
        assert_eq!(manager.state(), TransportState::Idle);
    }

    #[tokio::test]
    async fn connect_fails_fast_on_blank_id() {
        let (manager, _rx) = TransportManager::new(loopback());
        assert!(matches!(
            manager.connect("   "),
            Err(TransportError::InvalidRemoteId(_))
        ));
        assert_eq!(manager.state(), TransportState::Idle);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let (manager, _rx) = TransportManager::new(loopback());
        manager.destroy();
        manager.destroy();
        assert_eq!(manager.state(), TransportState::Closed);
        assert!(matches!(
            manager.initialize(None).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn unreachable_peer_reports_error_event() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let spare = assert_ok!(TcpListener::bind(loopback()).await);
            assert_ok!(spare.local_addr()).port()
        };
        let (manager, mut rx) = TransportManager::new(loopback());
        assert_ok!(manager.connect(&format!("ABCD1234@127.0.0.1:{port}")));

        let event = wait_for(&mut rx, |e| matches!(e, TransportEvent::Error(_))).await;
        assert!(matches!(
            event,
            TransportEvent::Error(TransportError::PeerUnreachable(_) | TransportError::Network(_))
        ));
        assert_eq!(manager.state(), TransportState::Failed);
    }

    #[tokio::test]
    async fn frames_cross_the_link_both_ways() {
        let (host, mut host_rx, client, mut client_rx) = connected_pair().await;
        assert_eq!(host.state(), TransportState::Connected);
        assert_eq!(client.state(), TransportState::Connected);

        assert!(client.send(PING.to_string()));
        let event = wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Frame(_))).await;
        let TransportEvent::Frame(frame) = event else { unreachable!() };
        assert_eq!(frame.kind, crate::protocol::messages::MessageType::Ping);

        assert!(host.send(PING.to_string()));
        wait_for(&mut client_rx, |e| matches!(e, TransportEvent::Frame(_))).await;

        client.destroy();
        host.destroy();
    }

    #[tokio::test]
    async fn malformed_frames_are_discarded() {
        let (host, mut host_rx, client, _client_rx) = connected_pair().await;

        assert!(client.send("not json at all".to_string()));
        assert!(client.send(r#"{"type":"Ping","timestamp":1}"#.to_string()));
        assert!(client.send(PING.to_string()));

        // Only the valid frame comes through
        let event = wait_for(&mut host_rx, |e| {
            matches!(e, TransportEvent::Frame(_) | TransportEvent::Error(_))
        })
        .await;
        assert!(matches!(event, TransportEvent::Frame(_)));
        assert_eq!(host.stats().malformed, 2);
        assert_eq!(host.state(), TransportState::Connected);

        client.destroy();
        host.destroy();
    }

    #[tokio::test]
    async fn second_peer_is_refused() {
        let (host, _host_rx, _client, _client_rx) = connected_pair().await;
        let peer_id = host.local_id().unwrap();

        let (intruder, mut intruder_rx) = TransportManager::new(loopback());
        assert_ok!(intruder.connect(&peer_id.to_string()));
        let event = wait_for(&mut intruder_rx, |e| matches!(e, TransportEvent::Error(_))).await;
        assert!(matches!(event, TransportEvent::Error(TransportError::PeerUnreachable(_))));
    }

    #[tokio::test]
    async fn explicit_close_is_not_retried() {
        let (host, mut host_rx, client, _client_rx) = connected_pair().await;
        client.destroy();

        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Closed)).await;
        assert_eq!(host.state(), TransportState::Closed);
        assert!(!host.send(PING.to_string()));
    }

    #[tokio::test]
    async fn dialer_redials_after_implicit_drop() {
        let listener = assert_ok!(TcpListener::bind(loopback()).await);
        let addr = assert_ok!(listener.local_addr());
        let (client, mut rx) = TransportManager::new(loopback());
        assert_ok!(client.connect(&format!("ROOM1234@{addr}")));

        let first = raw_accept(&listener).await;
        wait_for(&mut rx, |e| matches!(e, TransportEvent::Connected { .. })).await;

        // Dropping the socket sends no close frame
        drop(first);
        wait_for(&mut rx, |e| matches!(e, TransportEvent::Disconnected)).await;

        let _second = raw_accept(&listener).await;
        wait_for(&mut rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        assert_eq!(client.state(), TransportState::Connected);
        assert!(client.send(PING.to_string()));

        client.destroy();
    }

    #[tokio::test]
    async fn dialer_gives_up_after_max_attempts() {
        let listener = assert_ok!(TcpListener::bind(loopback()).await);
        let addr = assert_ok!(listener.local_addr());
        let (client, mut rx) = TransportManager::new(loopback());
        assert_ok!(client.connect(&format!("ROOM1234@{addr}")));

        let first = raw_accept(&listener).await;
        wait_for(&mut rx, |e| matches!(e, TransportEvent::Connected { .. })).await;

        // Nothing listens any more, so every redial is refused
        drop(listener);
        drop(first);

        let event = wait_for(&mut rx, |e| matches!(e, TransportEvent::Error(_))).await;
        assert!(matches!(
            event,
            TransportEvent::Error(TransportError::ReconnectFailed { attempts }) if attempts == MAX_RECONNECT_ATTEMPTS
        ));
        assert_eq!(client.state(), TransportState::Failed);
        assert!(!client.send(PING.to_string()));
    }

    #[tokio::test]
    async fn listener_keeps_room_for_returning_peer() {
        let (host, mut host_rx) = TransportManager::new(loopback());
        let peer_id = assert_ok!(host.initialize(None).await);

        let first = raw_dial(&peer_id).await;
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        drop(first);
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Disconnected)).await;
        assert_eq!(host.state(), TransportState::Reconnecting);

        let _second = raw_dial(&peer_id).await;
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        assert_eq!(host.state(), TransportState::Connected);

        // The first window elapses without touching the new link
        tokio::time::sleep(RECONNECT_WINDOW + Duration::from_millis(300)).await;
        assert_eq!(host.state(), TransportState::Connected);
        assert_no_errors(&mut host_rx);

        host.destroy();
    }

    #[tokio::test]
    async fn each_drop_gets_its_own_window() {
        let (host, mut host_rx) = TransportManager::new(loopback());
        let peer_id = assert_ok!(host.initialize(None).await);

        let first = raw_dial(&peer_id).await;
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        drop(first);
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Disconnected)).await;

        tokio::time::sleep(RECONNECT_WINDOW / 2).await;
        let second = raw_dial(&peer_id).await;
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Connected { .. })).await;
        drop(second);
        wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Disconnected)).await;

        // Past the first window, still inside the second
        tokio::time::sleep(RECONNECT_WINDOW / 2 + Duration::from_millis(200)).await;
        assert_eq!(host.state(), TransportState::Reconnecting);
        assert_no_errors(&mut host_rx);

        let event = wait_for(&mut host_rx, |e| matches!(e, TransportEvent::Error(_))).await;
        assert!(matches!(
            event,
            TransportEvent::Error(TransportError::ReconnectFailed { .. })
        ));
        assert_eq!(host.state(), TransportState::Failed);

        // A late peer cannot revive a failed transport
        assert!(tokio_tungstenite::connect_async(peer_id.ws_url()).await.is_err());
        assert_eq!(host.state(), TransportState::Failed);

        host.destroy();
    }
}
