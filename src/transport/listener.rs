//! Listening side: WebSocket upgrade on `/ws` plus a health route

use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::link::{self, LinkEnd};
use super::{
    Shared, StatsSnapshot, TransportError, TransportEvent, TransportState, RECONNECT_WINDOW,
};

/// Query parameters for the peer socket
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Room code the dialer was given
    pub room: String,
}

pub(crate) fn router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Serve until the transport is destroyed
pub(crate) async fn serve(shared: Arc<Shared>, listener: TcpListener) {
    let mut shutdown = shared.shutdown_signal();
    let result = axum::serve(listener, router(shared.clone()))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|closed| *closed).await;
        })
        .await;

    if let Err(e) = result {
        warn!(error = %e, "Listener stopped with error");
        shared.emit(TransportEvent::Error(TransportError::Network(e.to_string())));
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(shared): State<Arc<Shared>>,
) -> Response {
    if shared.is_shut_down()
        || matches!(shared.state(), TransportState::Closed | TransportState::Failed)
    {
        return (StatusCode::GONE, "Transport closed").into_response();
    }

    let room = query.room.trim().to_uppercase();
    if shared.local_room().as_deref() != Some(room.as_str()) {
        warn!(room = %query.room, "Rejected peer for unknown room");
        return (StatusCode::NOT_FOUND, "Unknown room").into_response();
    }

    if shared.has_link() {
        warn!(room = %room, "Rejected second peer");
        return (StatusCode::CONFLICT, "Room is full").into_response();
    }

    info!(room = %room, "Peer upgrading");
    ws.on_upgrade(move |socket| handle_socket(socket, shared, room))
}

async fn handle_socket(socket: WebSocket, shared: Arc<Shared>, room: String) {
    match link::run(shared.clone(), socket, room).await {
        LinkEnd::ClosedByPeer => {
            if shared.advance(TransportState::Closed) {
                shared.emit(TransportEvent::Closed);
            }
        }
        LinkEnd::Dropped { generation } => await_return(shared, generation).await,
        LinkEnd::Shutdown | LinkEnd::Rejected => {}
    }
}

/// Hold the room open for the peer of link `generation`, then give up.
/// A newer link installed during the window cancels it.
async fn await_return(shared: Arc<Shared>, generation: u64) {
    if !shared.begin_reconnect(generation) {
        return;
    }
    shared.emit(TransportEvent::Disconnected);
    shared.emit(TransportEvent::Reconnecting { attempt: 1 });

    let mut shutdown = shared.shutdown_signal();
    tokio::select! {
        _ = tokio::time::sleep(RECONNECT_WINDOW) => {}
        _ = shutdown.wait_for(|closed| *closed) => return,
    }

    if shared.expire_window(generation) {
        warn!(
            window_ms = RECONNECT_WINDOW.as_millis() as u64,
            "Peer did not return in time"
        );
        shared.emit(TransportEvent::Error(TransportError::ReconnectFailed { attempts: 1 }));
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    room: Option<String>,
    state: TransportState,
    stats: StatsSnapshot,
}

async fn health_handler(State(shared): State<Arc<Shared>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        room: shared.local_room(),
        state: shared.state(),
        stats: shared.stats().snapshot(),
    })
}
