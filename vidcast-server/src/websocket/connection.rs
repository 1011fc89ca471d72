use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vidcast_core::{ClientIdentity, SessionController};

use crate::websocket::messages::WsMessage;

/// One subscribed observer.
///
/// Owns nothing of the session: just a push channel and, while its identity
/// is the current owner of a playing cast, the periodic position ticker.
/// The ticker is always owned here so every exit path (disconnect, pause,
/// ownership change, session close) can stop it.
pub struct ObserverConnection {
    pub id: Uuid,
    pub identity: ClientIdentity,
    sender: mpsc::Sender<WsMessage>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ObserverConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverConnection")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("channel_closed", &self.sender.is_closed())
            .field("ticker_running", &self.ticker.lock().is_some())
            .finish()
    }
}

impl ObserverConnection {
    pub fn new(identity: ClientIdentity, sender: mpsc::Sender<WsMessage>) -> Self {
        Self {
            id: Uuid::now_v7(),
            identity,
            sender,
            ticker: Mutex::new(None),
        }
    }

    /// Best-effort, non-blocking push. A full or closed channel is a failed
    /// send; the hub removes the connection instead of retrying, so one
    /// slow observer never delays the rest.
    pub fn push(&self, message: WsMessage) -> Result<(), ()> {
        self.sender.try_send(message).map_err(|_| ())
    }

    /// Start the owner position ticker if it is not already running.
    pub fn start_ticker(
        self: &Arc<Self>,
        controller: Arc<SessionController>,
        period: Duration,
    ) {
        let mut slot = self.ticker.lock();
        if slot.is_some() {
            return;
        }

        let conn = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                // The controller answers None the moment this connection is
                // no longer the playing owner; the hub also aborts us on the
                // state change, whichever comes first.
                match controller.sample_position(&conn.identity).await {
                    Some(position) => {
                        if conn.push(WsMessage::Position { position }).is_err() {
                            break;
                        }
                    }
                    None => continue,
                }
            }
        }));
    }

    pub fn stop_ticker(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for ObserverConnection {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
