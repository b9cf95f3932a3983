//! Read/write pump shared by both ends of a peer link

use std::fmt::Display;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::validate_frame;
use crate::util::rate_limit::LinkRateLimiter;

use super::{Shared, TransportEvent, TransportState, OUTBOUND_BUFFER};

/// What a socket message means to the link
pub(crate) enum Inbound {
    Text(String),
    Close,
    Ignored,
}

/// Bridges the axum and tungstenite message types
pub(crate) trait WsMessage: Sized + Send + Unpin + 'static {
    fn text(text: String) -> Self;
    fn classify(self) -> Inbound;
}

impl WsMessage for axum::extract::ws::Message {
    fn text(text: String) -> Self {
        Self::Text(text)
    }

    fn classify(self) -> Inbound {
        match self {
            Self::Text(text) => Inbound::Text(text),
            Self::Close(_) => Inbound::Close,
            _ => Inbound::Ignored,
        }
    }
}

impl WsMessage for tokio_tungstenite::tungstenite::Message {
    fn text(text: String) -> Self {
        Self::Text(text)
    }

    fn classify(self) -> Inbound {
        match self {
            Self::Text(text) => Inbound::Text(text),
            Self::Close(_) => Inbound::Close,
            _ => Inbound::Ignored,
        }
    }
}

/// Why a link stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkEnd {
    /// Peer sent a close frame
    ClosedByPeer,
    /// Socket errored or ended without a close frame
    Dropped { generation: u64 },
    /// Local `destroy`
    Shutdown,
    /// Another link was already active, or the transport already failed
    Rejected,
}

/// Drive one socket until it ends. Marks the transport `Connected` while the
/// link is up; the caller decides what happens afterwards.
pub(crate) async fn run<S, M, E>(shared: Arc<Shared>, socket: S, peer: String) -> LinkEnd
where
    S: Stream<Item = Result<M, E>> + Sink<M> + Send + 'static,
    M: WsMessage,
    E: Display + Send,
{
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    let Some(generation) = shared.install_link(outbound_tx) else {
        warn!(peer = %peer, "Link already active, refusing peer");
        let _ = sink.close().await;
        return LinkEnd::Rejected;
    };
    if !shared.advance(TransportState::Connected) {
        shared.clear_link();
        let _ = sink.close().await;
        return match shared.state() {
            TransportState::Failed => LinkEnd::Rejected,
            _ => LinkEnd::Shutdown,
        };
    }
    info!(peer = %peer, generation, "Peer link up");
    shared.emit(TransportEvent::Connected { peer: peer.clone() });

    // Writer: outbound channel -> socket. Ends when the sender is dropped.
    tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sink.send(M::text(text)).await.is_err() {
                debug!("Link writer failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    let limiter = LinkRateLimiter::new();
    let mut shutdown = shared.shutdown_signal();

    let end = if shared.is_shut_down() {
        LinkEnd::Shutdown
    } else {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break LinkEnd::Shutdown;
                    }
                }
                next = stream.next() => match next {
                    Some(Ok(msg)) => match msg.classify() {
                        Inbound::Text(text) => accept_text(&shared, &limiter, &text),
                        Inbound::Close => break LinkEnd::ClosedByPeer,
                        Inbound::Ignored => {}
                    },
                    Some(Err(e)) => {
                        warn!(peer = %peer, error = %e, "Link read error");
                        break LinkEnd::Dropped { generation };
                    }
                    None => break LinkEnd::Dropped { generation },
                }
            }
        }
    };

    shared.clear_link();
    info!(peer = %peer, reason = ?end, "Peer link down");
    end
}

/// Validate one inbound text frame and hand it to the consumer
pub(crate) fn accept_text(shared: &Shared, limiter: &LinkRateLimiter, text: &str) {
    if !limiter.check_inbound() {
        shared.stats.rate_limited.fetch_add(1, Ordering::Relaxed);
        warn!("Inbound rate limit exceeded, dropping frame");
        return;
    }

    match validate_frame(text) {
        Ok(frame) => {
            shared.stats.received.fetch_add(1, Ordering::Relaxed);
            shared.emit(TransportEvent::Frame(frame));
        }
        Err(e) => {
            shared.stats.malformed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Discarding malformed frame");
        }
    }
}
