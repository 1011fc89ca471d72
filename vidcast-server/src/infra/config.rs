use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Server configuration, loaded from an optional TOML file with CLI/env
/// overrides applied on top. Every field has a default so a bare
/// `vidcast-server` works on a fresh device.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub player: PlayerConfig,
    pub resolver: ResolverConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Playback binary, talked to over its JSON IPC socket.
    pub binary: PathBuf,
    pub ipc_socket: PathBuf,
    /// Looping placeholder shown while a reference resolves.
    pub loading_screen: PathBuf,
    pub fullscreen: bool,
    /// Step for increase/decrease volume, in player volume units.
    pub volume_step: f64,
    /// Multiplier for increase/decrease speed.
    pub speed_factor: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("mpv"),
            ipc_socket: PathBuf::from("/tmp/vidcast-mpv.sock"),
            loading_screen: PathBuf::from("loading-screen.mp4"),
            fullscreen: true,
            volume_step: 5.0,
            speed_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub binary: PathBuf,
    /// Format selector handed to the resolver. WebM muxes are avoided
    /// because the target playback devices decode them poorly.
    pub format: String,
    pub timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            format: "bestvideo[ext!=webm]+bestaudio[ext!=webm]/best[ext!=webm]".to_owned(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Skip distance for skipForward/skipBackwards, in seconds.
    pub seek_step_secs: f64,
    /// Period of the owner's position push, in milliseconds.
    pub position_sample_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_step_secs: 30.0,
            position_sample_ms: 500,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid listen address {}:{}",
                    self.server.host, self.server.port
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.playback.position_sample_ms, 500);
        assert!(config.listen_addr().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_elsewhere() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [playback]
            seek_step_secs = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.playback.seek_step_secs, 10.0);
        assert_eq!(config.resolver.timeout_secs, 30);
    }
}
