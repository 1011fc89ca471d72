use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use crate::error::{CastError, CastResult};
use crate::identity::ClientIdentity;
use crate::player::{Player, PlayerEvent};
use crate::resolver::Resolver;
use crate::session::{CastSession, Lifecycle, SessionSnapshot, StatusUpdate};

/// Capacity of the status broadcast channel. Observers that fall further
/// behind than this see a lag error and resynchronize from a fresh snapshot.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Result of an accepted and completed cast start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedCast {
    pub duration: f64,
}

/// The cast session state machine.
///
/// Owns the single [`CastSession`] record behind a mutex; every mutation is
/// serialized through it. Slow work (resolution) runs outside the lock and
/// re-validates its captured generation before applying anything, so a cast
/// started mid-flight simply renders the older continuation inert.
///
/// Status changes are published in mutation order on a broadcast channel;
/// the hub fans them out to observer connections.
pub struct SessionController {
    player: Arc<dyn Player>,
    resolver: Arc<dyn Resolver>,
    session: Mutex<CastSession>,
    updates: broadcast::Sender<StatusUpdate>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("observers", &self.updates.receiver_count())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Build the controller and start watching the player for termination.
    pub fn new(player: Arc<dyn Player>, resolver: Arc<dyn Resolver>) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let controller = Arc::new(Self {
            player,
            resolver,
            session: Mutex::new(CastSession::default()),
            updates,
        });
        controller.clone().spawn_close_watcher();
        controller
    }

    /// Subscribe to status updates. Delivery order matches mutation order.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Personalized status query: true only for the owner of a live,
    /// playing cast.
    pub async fn is_playing_for(&self, identity: &ClientIdentity) -> bool {
        let snapshot = self.session.lock().await.snapshot();
        snapshot.is_playing_for(identity) && self.player.is_running()
    }

    /// Start (or supersede) a cast. Returns once the player has confirmed
    /// the resolved source and the duration is known; every other command
    /// is a single adapter round trip.
    pub async fn start_cast(
        &self,
        reference: &str,
        requester: ClientIdentity,
    ) -> CastResult<StartedCast> {
        if reference.trim().is_empty() {
            return Err(CastError::InvalidParameters);
        }

        let generation = {
            let mut session = self.session.lock().await;
            let generation = session.begin(requester, reference);
            info!(%requester, reference, "cast accepted, resolving");
            self.publish_locked(&session);
            generation
        };

        // Placeholder goes up immediately so the output device never shows
        // a stale frame while resolution runs.
        if let Err(err) = self.player.show_loading().await {
            let mut session = self.session.lock().await;
            if !session.is_current(generation) {
                return Err(CastError::Superseded);
            }
            error!(%err, "failed to show loading placeholder");
            session.dispose_after_failure();
            self.publish_locked(&session);
            return Err(err.into());
        }

        // Slow path, runs unlocked. A newer cast invalidates this one by
        // minting a fresh generation; the checks below make the result inert.
        let resolved = match self.resolver.resolve(reference).await {
            Ok(resolved) => resolved,
            Err(err) => {
                let mut session = self.session.lock().await;
                if !session.is_current(generation) {
                    debug!(reference, "discarding superseded resolution failure");
                    return Err(CastError::Superseded);
                }
                error!(%err, reference, "resolution failed");
                session.dispose_after_failure();
                self.publish_locked(&session);
                return Err(err.into());
            }
        };

        // Load and commit under one hold of the lock: a supersede cannot
        // interleave between the generation check and the loadfile, so a
        // stale source never lands on the player after the winner's.
        {
            let mut session = self.session.lock().await;
            if !session.is_current(generation) {
                debug!(reference, "discarding superseded resolution");
                return Err(CastError::Superseded);
            }
            if let Err(err) = self.player.load(&resolved.url).await {
                error!(%err, "player rejected resolved source");
                session.dispose_after_failure();
                self.publish_locked(&session);
                return Err(err.into());
            }
            session.mark_ready();
            info!(reference, "cast ready");
            self.publish_locked(&session);
        }

        let duration = match self.player.duration().await {
            Ok(duration) => duration.max(0.0),
            Err(err) => {
                let session = self.session.lock().await;
                if !session.is_current(generation) {
                    return Err(CastError::Superseded);
                }
                warn!(%err, "duration query failed");
                return Err(err.into());
            }
        };

        {
            let session = self.session.lock().await;
            if !session.is_current(generation) {
                return Err(CastError::Superseded);
            }
        }

        Ok(StartedCast { duration })
    }

    pub async fn play(&self, identity: &ClientIdentity) -> CastResult<()> {
        let mut session = self.session.lock().await;
        self.authorize(&session, identity)?;
        self.player.play().await?;
        session.playing = true;
        self.publish_locked(&session);
        Ok(())
    }

    pub async fn pause(&self, identity: &ClientIdentity) -> CastResult<()> {
        let mut session = self.session.lock().await;
        self.authorize(&session, identity)?;
        self.player.pause().await?;
        session.playing = false;
        self.publish_locked(&session);
        Ok(())
    }

    pub async fn toggle_pause(&self, identity: &ClientIdentity) -> CastResult<()> {
        let mut session = self.session.lock().await;
        self.authorize(&session, identity)?;
        if session.playing {
            self.player.pause().await?;
            session.playing = false;
        } else {
            self.player.play().await?;
            session.playing = true;
        }
        self.publish_locked(&session);
        Ok(())
    }

    /// Owner-issued quit. The process termination event folds the session
    /// back to `Empty`; this transition only records intent and stops the
    /// playing flag from lingering.
    pub async fn quit(&self, identity: &ClientIdentity) -> CastResult<()> {
        let mut session = self.session.lock().await;
        self.authorize(&session, identity)?;
        self.player.quit().await?;
        session.mark_closed();
        self.publish_locked(&session);
        Ok(())
    }

    pub async fn seek(&self, identity: &ClientIdentity, offset_secs: f64) -> CastResult<()> {
        if !offset_secs.is_finite() {
            return Err(CastError::InvalidParameters);
        }
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        self.player.seek(offset_secs).await?;
        Ok(())
    }

    /// Current position, clamped to zero. Players report slightly negative
    /// positions around a source switch; those are presented as the start
    /// of the stream, never as an error.
    pub async fn position(&self, identity: &ClientIdentity) -> CastResult<f64> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.position().await?.max(0.0))
    }

    pub async fn set_position(&self, identity: &ClientIdentity, secs: f64) -> CastResult<f64> {
        if !secs.is_finite() {
            return Err(CastError::InvalidParameters);
        }
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.set_position(secs).await?.max(0.0))
    }

    pub async fn duration(&self, identity: &ClientIdentity) -> CastResult<f64> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.duration().await?.max(0.0))
    }

    pub async fn volume(&self, identity: &ClientIdentity) -> CastResult<f64> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.volume().await?)
    }

    pub async fn set_volume(&self, identity: &ClientIdentity, volume: f64) -> CastResult<f64> {
        if !volume.is_finite() {
            return Err(CastError::InvalidParameters);
        }
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.set_volume(volume).await?)
    }

    pub async fn increase_volume(&self, identity: &ClientIdentity) -> CastResult<()> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.increase_volume().await?)
    }

    pub async fn decrease_volume(&self, identity: &ClientIdentity) -> CastResult<()> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.decrease_volume().await?)
    }

    pub async fn increase_speed(&self, identity: &ClientIdentity) -> CastResult<()> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.increase_speed().await?)
    }

    pub async fn decrease_speed(&self, identity: &ClientIdentity) -> CastResult<()> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.decrease_speed().await?)
    }

    pub async fn show_subtitles(&self, identity: &ClientIdentity) -> CastResult<()> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.show_subtitles().await?)
    }

    pub async fn hide_subtitles(&self, identity: &ClientIdentity) -> CastResult<()> {
        let session = self.session.lock().await;
        self.authorize(&session, identity)?;
        Ok(self.player.hide_subtitles().await?)
    }

    /// Position sample for the owner's live ticker. `None` whenever the
    /// ticker should be silent: not the owner, not playing, or the player
    /// went away between ticks.
    pub async fn sample_position(&self, identity: &ClientIdentity) -> Option<f64> {
        {
            let session = self.session.lock().await;
            if session.lifecycle != Lifecycle::Ready
                || !session.playing
                || session.owner.as_ref() != Some(identity)
            {
                return None;
            }
        }
        self.player.position().await.ok().map(|p| p.max(0.0))
    }

    /// The single ordered command guard. Every transport command goes
    /// through this; the order of the checks is what lets a client tell
    /// "nothing is playing" from "still loading" from "someone else owns
    /// the cast".
    fn authorize(&self, session: &CastSession, identity: &ClientIdentity) -> CastResult<()> {
        match session.lifecycle {
            Lifecycle::Empty | Lifecycle::Closed => return Err(CastError::NoActiveCast),
            Lifecycle::Loading => return Err(CastError::CastLoading),
            Lifecycle::Ready => {}
        }
        if session.owner.as_ref() != Some(identity) {
            return Err(CastError::NotOwner);
        }
        if !self.player.is_running() {
            return Err(CastError::CastExpired);
        }
        Ok(())
    }

    /// Publish a snapshot while still holding the session lock, so updates
    /// hit the channel in mutation order.
    fn publish_locked(&self, session: &CastSession) {
        let _ = self.updates.send(StatusUpdate::now(session.snapshot()));
    }

    /// One unified close transition for every way the player can go away:
    /// owner quit, crash, external kill. Observers must never be left
    /// believing playback continues.
    fn spawn_close_watcher(self: Arc<Self>) {
        let mut events = self.player.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(PlayerEvent::Closed) => {
                        let mut session = self.session.lock().await;
                        info!("player terminated, closing session");
                        session.close();
                        self.publish_locked(&session);
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
