use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;
use vidcast_core::{SessionController, SessionSnapshot, StatusUpdate};

use crate::websocket::connection::ObserverConnection;
use crate::websocket::messages::WsMessage;

/// Fan-out of session state changes to every observer connection.
///
/// A single task drains the controller's update channel and pushes a
/// personalized full snapshot to each connection, so all observers see
/// events in the order the controller produced them. Sends are
/// best-effort: a connection that cannot accept a message is dropped.
pub struct BroadcastHub {
    controller: Arc<SessionController>,
    connections: DashMap<Uuid, Arc<ObserverConnection>>,
    sample_period: Duration,
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("connection_count", &self.connections.len())
            .field("sample_period", &self.sample_period)
            .finish()
    }
}

impl BroadcastHub {
    pub fn new(controller: Arc<SessionController>, sample_period: Duration) -> Arc<Self> {
        Arc::new(Self {
            controller,
            connections: DashMap::new(),
            sample_period,
        })
    }

    /// Start the fan-out task. The receiver is created before the task is
    /// spawned, so updates published before its first poll are queued, not
    /// lost. Lagging behind the update channel is recovered by re-reading
    /// the authoritative snapshot; snapshots are full state, so skipped
    /// intermediates cost nothing.
    pub fn spawn_fanout(self: &Arc<Self>) {
        let hub = Arc::clone(self);
        let mut updates = self.controller.subscribe();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => hub.dispatch(&update),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "status fan-out lagged, resynchronizing");
                        let snapshot = hub.controller.snapshot().await;
                        hub.dispatch(&StatusUpdate::now(snapshot));
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Register a connection and send it its initial personalized snapshot.
    /// The connection is inserted before the snapshot is read, so a mutation
    /// racing this call reaches it through the fan-out instead of falling
    /// into the gap.
    pub async fn register(&self, connection: Arc<ObserverConnection>) {
        self.connections.insert(connection.id, Arc::clone(&connection));

        let snapshot = self.controller.snapshot().await;
        let initial = WsMessage::initial(&snapshot, &connection.identity);
        if connection.push(initial).is_err() {
            debug!(id = %connection.id, "observer gone before initial snapshot");
            self.remove(connection.id);
            return;
        }
        self.manage_ticker(&connection, &snapshot);
    }

    pub fn remove(&self, id: Uuid) {
        if let Some((_, connection)) = self.connections.remove(&id) {
            connection.stop_ticker();
            trace!(%id, "observer removed");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn dispatch(&self, update: &StatusUpdate) {
        let mut dead = Vec::new();

        for entry in self.connections.iter() {
            let connection = entry.value();
            let message = WsMessage::status_for(update, &connection.identity);
            if connection.push(message).is_err() {
                dead.push(connection.id);
                continue;
            }
            self.manage_ticker(connection, &update.snapshot);
        }

        for id in dead {
            self.remove(id);
        }
    }

    /// The position ticker runs exactly while this connection is the owner
    /// of a playing cast; every other state stops it.
    fn manage_ticker(&self, connection: &Arc<ObserverConnection>, snapshot: &SessionSnapshot) {
        if snapshot.is_playing_for(&connection.identity) {
            connection.start_ticker(Arc::clone(&self.controller), self.sample_period);
        } else {
            connection.stop_ticker();
        }
    }
}
