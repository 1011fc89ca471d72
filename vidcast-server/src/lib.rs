//! # Vidcast Server
//!
//! HTTP and WebSocket binding for the vidcast cast controller.
//!
//! One client (the caster) starts playback of a remote video on the shared
//! output device and controls it; any number of observers subscribe over
//! WebSocket and receive status snapshots as the session changes. Playback
//! itself is delegated to an external `mpv` process, stream resolution to
//! `yt-dlp`; this crate supplies the adapters for both and the transport
//! surface over [`vidcast_core::SessionController`].

pub mod errors;
pub mod handlers;
pub mod infra;
pub mod player;
pub mod resolver;
pub mod routes;
pub mod websocket;

#[cfg(test)]
mod tests;

pub use infra::app_state::AppState;

/// Server version reported to remotes.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
