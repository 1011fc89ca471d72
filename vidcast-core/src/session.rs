use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::ClientIdentity;

/// Token minted every time a new cast is started.
///
/// Asynchronous work (resolution, load confirmation, duration queries)
/// captures the generation at issue time and compares it against the current
/// one before applying its result; a mismatch means the work was superseded
/// and its result is inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastGeneration(Uuid);

impl CastGeneration {
    pub fn mint() -> Self {
        Self(Uuid::now_v7())
    }
}

/// Lifecycle of the single cast session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// No cast, or the previous one has fully terminated.
    Empty,
    /// A cast was accepted and its reference is being resolved.
    Loading,
    /// The player has confirmed the real source.
    Ready,
    /// The player reported termination; folds straight back to `Empty`.
    Closed,
}

/// The single authoritative cast session record.
///
/// At most one exists per process. All mutation goes through the
/// [`SessionController`](crate::controller::SessionController); nothing else
/// holds a mutable reference.
#[derive(Debug, Clone)]
pub struct CastSession {
    pub owner: Option<ClientIdentity>,
    pub generation: Option<CastGeneration>,
    pub lifecycle: Lifecycle,
    /// Meaningful only while `lifecycle` is [`Lifecycle::Ready`].
    pub playing: bool,
    /// The reference the owner originally supplied, kept for diagnostics.
    pub source_ref: Option<String>,
}

impl Default for CastSession {
    fn default() -> Self {
        Self {
            owner: None,
            generation: None,
            lifecycle: Lifecycle::Empty,
            playing: false,
            source_ref: None,
        }
    }
}

impl CastSession {
    /// Supersede whatever is active and enter `Loading` for a new cast.
    /// Returns the freshly minted generation for the caller to capture.
    pub fn begin(&mut self, owner: ClientIdentity, source_ref: &str) -> CastGeneration {
        let generation = CastGeneration::mint();
        self.owner = Some(owner);
        self.generation = Some(generation);
        self.lifecycle = Lifecycle::Loading;
        self.playing = false;
        self.source_ref = Some(source_ref.to_owned());
        generation
    }

    /// Whether `generation` is still the live one.
    pub fn is_current(&self, generation: CastGeneration) -> bool {
        self.generation == Some(generation)
    }

    /// The player confirmed the resolved source.
    pub fn mark_ready(&mut self) {
        self.lifecycle = Lifecycle::Ready;
        self.playing = true;
    }

    /// An owner-issued quit was dispatched; the close event will fold this
    /// to `Empty`.
    pub fn mark_closed(&mut self) {
        self.lifecycle = Lifecycle::Closed;
        self.playing = false;
    }

    /// The playback process terminated.
    pub fn close(&mut self) {
        self.lifecycle = Lifecycle::Empty;
        self.playing = false;
    }

    /// Resolution failed for the live generation. Owner and generation stay
    /// in place so a retry by the same owner remains distinguishable, but
    /// the session is disposable: commands report `NoActiveCast` until a
    /// fresh cast is started.
    pub fn dispose_after_failure(&mut self) {
        self.lifecycle = Lifecycle::Empty;
        self.playing = false;
    }

    pub fn status(&self) -> PlaybackStatus {
        match self.lifecycle {
            Lifecycle::Ready if self.playing => PlaybackStatus::Playing,
            Lifecycle::Ready => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            lifecycle: self.lifecycle,
            owner: self.owner,
        }
    }
}

/// Textual playback status pushed to observers.
///
/// A string rather than a raw boolean so the vocabulary can grow without
/// breaking older observers; the legacy `isPlaying` flag is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopped => "stopped",
        }
    }
}

/// Read-only view of the session, safe to hand to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: PlaybackStatus,
    pub lifecycle: Lifecycle,
    pub owner: Option<ClientIdentity>,
}

impl SessionSnapshot {
    /// Personalized playing flag: a non-owner always sees `false`, even
    /// while a cast is globally active for someone else.
    pub fn is_playing_for(&self, identity: &ClientIdentity) -> bool {
        self.status == PlaybackStatus::Playing && self.owner.as_ref() == Some(identity)
    }
}

/// A state-change event published by the controller to the broadcast hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub snapshot: SessionSnapshot,
    pub at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn now(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn identity(last: u8) -> ClientIdentity {
        ClientIdentity::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
    }

    #[test]
    fn begin_supersedes_and_mints_fresh_generation() {
        let mut session = CastSession::default();
        let first = session.begin(identity(5), "v1");
        assert_eq!(session.lifecycle, Lifecycle::Loading);
        assert!(session.is_current(first));

        let second = session.begin(identity(9), "v2");
        assert_ne!(first, second);
        assert!(!session.is_current(first));
        assert!(session.is_current(second));
        assert_eq!(session.owner, Some(identity(9)));
        assert_eq!(session.source_ref.as_deref(), Some("v2"));
        assert!(!session.playing);
    }

    #[test]
    fn status_follows_lifecycle_and_playing_flag() {
        let mut session = CastSession::default();
        assert_eq!(session.status(), PlaybackStatus::Stopped);

        session.begin(identity(5), "v1");
        assert_eq!(session.status(), PlaybackStatus::Stopped);

        session.mark_ready();
        assert_eq!(session.status(), PlaybackStatus::Playing);

        session.playing = false;
        assert_eq!(session.status(), PlaybackStatus::Paused);

        session.close();
        assert_eq!(session.status(), PlaybackStatus::Stopped);
        assert_eq!(session.lifecycle, Lifecycle::Empty);
    }

    #[test]
    fn snapshot_personalizes_playing_flag() {
        let mut session = CastSession::default();
        session.begin(identity(5), "v1");
        session.mark_ready();

        let snapshot = session.snapshot();
        assert!(snapshot.is_playing_for(&identity(5)));
        assert!(!snapshot.is_playing_for(&identity(9)));
    }

    #[test]
    fn dispose_after_failure_keeps_owner_and_generation() {
        let mut session = CastSession::default();
        let generation = session.begin(identity(5), "v1");
        session.dispose_after_failure();

        assert_eq!(session.lifecycle, Lifecycle::Empty);
        assert_eq!(session.owner, Some(identity(5)));
        assert!(session.is_current(generation));
    }
}
