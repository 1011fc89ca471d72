use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use vidcast_core::ClientIdentity;

use crate::infra::app_state::AppState;
use crate::websocket::{connection::ObserverConnection, messages};

/// Capacity of the per-observer push queue. Filling up means the peer is
/// not draining its socket; the hub treats that as a dead connection.
const OBSERVER_QUEUE_CAPACITY: usize = 64;

/// Handle a WebSocket upgrade for an observer subscription.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    let identity = ClientIdentity::from(addr);
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Drive one observer connection until it drops.
///
/// Observers are read-only: inbound frames other than close are ignored.
/// The hub pushes into the mpsc queue; this task forwards to the socket.
async fn handle_socket(socket: WebSocket, state: AppState, identity: ClientIdentity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel(OBSERVER_QUEUE_CAPACITY);

    let connection = Arc::new(ObserverConnection::new(identity, tx));
    let conn_id = connection.id;
    debug!(%identity, id = %conn_id, "observer connected");

    state.hub.register(connection).await;

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match messages::to_ws(&msg) {
                Ok(frame) => {
                    if ws_sender.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(err) => trace!(%err, "skipping unencodable push message"),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    debug!(%identity, id = %conn_id, "observer disconnected");
    state.hub.remove(conn_id);
    send_task.abort();
}
