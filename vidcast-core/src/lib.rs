//! # Vidcast Core
//!
//! Domain model for the vidcast remote-control service: the single
//! authoritative cast session, the controller that serializes every mutation
//! of it, and the adapter contracts the controller drives (an external
//! playback process and an external stream resolver).
//!
//! Nothing in this crate knows about HTTP or WebSockets; the server crate
//! binds these operations to a transport.

pub mod controller;
pub mod error;
pub mod identity;
pub mod player;
pub mod resolver;
pub mod session;

pub use controller::{SessionController, StartedCast};
pub use error::{CastError, StatusCode};
pub use identity::ClientIdentity;
pub use player::{Player, PlayerError, PlayerEvent};
pub use resolver::{ResolveError, ResolvedSource, Resolver};
pub use session::{
    CastGeneration, CastSession, Lifecycle, PlaybackStatus, SessionSnapshot, StatusUpdate,
};
