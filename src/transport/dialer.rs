//! Dialing side: tokio-tungstenite client with bounded reconnect

use std::io::ErrorKind;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use super::link::{self, LinkEnd};
use super::{
    PeerId, Shared, TransportError, TransportEvent, TransportState, CONNECT_TIMEOUT,
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dial `peer`, run the link, and redial the same identity after an
/// implicit disconnect
pub(crate) async fn run(shared: Arc<Shared>, peer: PeerId) {
    let label = peer.to_string();

    let mut socket = match dial(&peer).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(peer = %label, error = %e, "Connect failed");
            if shared.advance(TransportState::Failed) {
                shared.emit(TransportEvent::Error(e));
            }
            return;
        }
    };

    loop {
        if !shared.advance(TransportState::Open) {
            return;
        }
        match link::run(shared.clone(), socket, label.clone()).await {
            LinkEnd::ClosedByPeer => {
                if shared.advance(TransportState::Closed) {
                    shared.emit(TransportEvent::Closed);
                }
                return;
            }
            LinkEnd::Shutdown | LinkEnd::Rejected => return,
            LinkEnd::Dropped { generation } => {
                if !shared.begin_reconnect(generation) {
                    return;
                }
            }
        }

        shared.emit(TransportEvent::Disconnected);

        socket = match reconnect(&shared, &peer).await {
            Some(socket) => socket,
            None => return,
        };
    }
}

/// Exponential backoff, at most `MAX_RECONNECT_ATTEMPTS` dials
async fn reconnect(shared: &Shared, peer: &PeerId) -> Option<Socket> {
    let mut shutdown = shared.shutdown_signal();

    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        if shared.is_shut_down() {
            return None;
        }
        let delay = RECONNECT_BASE_DELAY * 2u32.pow(attempt - 1);
        info!(
            peer = %peer,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting"
        );
        shared.emit(TransportEvent::Reconnecting { attempt });

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return None,
        }

        match dial(peer).await {
            Ok(socket) => return Some(socket),
            Err(e) => warn!(peer = %peer, attempt, error = %e, "Reconnect attempt failed"),
        }
    }

    if shared.advance(TransportState::Failed) {
        shared.emit(TransportEvent::Error(TransportError::ReconnectFailed {
            attempts: MAX_RECONNECT_ATTEMPTS,
        }));
    }
    None
}

async fn dial(peer: &PeerId) -> Result<Socket, TransportError> {
    match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(peer.ws_url())).await {
        Err(_) => Err(TransportError::ConnectTimeout),
        Ok(Err(e)) => Err(classify(e)),
        Ok(Ok((socket, _response))) => Ok(socket),
    }
}

fn classify(error: WsError) -> TransportError {
    match error {
        WsError::Io(e)
            if matches!(
                e.kind(),
                ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::AddrNotAvailable
            ) =>
        {
            TransportError::PeerUnreachable(e.to_string())
        }
        WsError::Http(response) => {
            TransportError::PeerUnreachable(format!("peer answered {}", response.status()))
        }
        other => TransportError::Network(other.to_string()),
    }
}
