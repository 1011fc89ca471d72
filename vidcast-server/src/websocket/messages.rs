use anyhow::Result;
use axum::extract::ws::{Message, Utf8Bytes};
use serde::Serialize;
use vidcast_core::{ClientIdentity, PlaybackStatus, SessionSnapshot, StatusUpdate};

/// Messages pushed to observer connections.
///
/// Status messages are full snapshots, never diffs; `is_playing` is the
/// legacy boolean older remotes key on, `status` the growing textual
/// vocabulary newer ones prefer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WsMessage {
    Status {
        status: PlaybackStatus,
        is_playing: bool,
        timestamp: i64,
    },
    Position {
        position: f64,
    },
}

impl WsMessage {
    /// Snapshot personalized for one observer: only the owner of a live,
    /// playing cast sees `isPlaying: true`.
    pub fn status_for(update: &StatusUpdate, identity: &ClientIdentity) -> Self {
        WsMessage::Status {
            status: update.snapshot.status,
            is_playing: update.snapshot.is_playing_for(identity),
            timestamp: update.at.timestamp_millis(),
        }
    }

    pub fn initial(snapshot: &SessionSnapshot, identity: &ClientIdentity) -> Self {
        WsMessage::Status {
            status: snapshot.status,
            is_playing: snapshot.is_playing_for(identity),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Convert a push message to a WebSocket frame.
pub fn to_ws(msg: &WsMessage) -> Result<Message> {
    let json = serde_json::to_string(msg)?;
    Ok(Message::Text(Utf8Bytes::from(json)))
}
