use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("unexpected player reply: {0}")]
    Protocol(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

/// Events emitted by the playback process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The playback process terminated, whatever the cause: an explicit
    /// quit, a crash, or an external kill. Emitted at most once per process.
    Closed,
}

/// Capability surface over the external playback process.
///
/// The controller is the sole caller; no other component spawns, terminates,
/// or talks to the process directly. Positions, durations and seek offsets
/// are in seconds; volume is in player units (0-100).
#[async_trait]
pub trait Player: Send + Sync {
    /// Show the looping loading placeholder, reusing the running process if
    /// there is one so a new cast never leaves a blank screen between
    /// sources. Spawns the process when none is running.
    async fn show_loading(&self) -> PlayerResult<()>;

    /// Replace the current source with the resolved stream URL and start
    /// playback. Resolves once the player has accepted the new source.
    async fn load(&self, url: &str) -> PlayerResult<()>;

    /// Whether the playback process is currently alive.
    fn is_running(&self) -> bool;

    async fn play(&self) -> PlayerResult<()>;

    async fn pause(&self) -> PlayerResult<()>;

    /// Seek by a signed offset in seconds.
    async fn seek(&self, offset_secs: f64) -> PlayerResult<()>;

    async fn position(&self) -> PlayerResult<f64>;

    /// Jump to an absolute position and report the position actually taken.
    async fn set_position(&self, secs: f64) -> PlayerResult<f64>;

    async fn duration(&self) -> PlayerResult<f64>;

    async fn volume(&self) -> PlayerResult<f64>;

    async fn set_volume(&self, volume: f64) -> PlayerResult<f64>;

    async fn increase_volume(&self) -> PlayerResult<()>;

    async fn decrease_volume(&self) -> PlayerResult<()>;

    async fn increase_speed(&self) -> PlayerResult<()>;

    async fn decrease_speed(&self) -> PlayerResult<()>;

    async fn show_subtitles(&self) -> PlayerResult<()>;

    async fn hide_subtitles(&self) -> PlayerResult<()>;

    /// Ask the process to terminate. Termination is reported through the
    /// event channel, not by this call returning.
    async fn quit(&self) -> PlayerResult<()>;

    /// Subscribe to lifecycle events of the playback process.
    fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent>;
}
