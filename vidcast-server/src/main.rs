use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidcast_core::{Player, Resolver, SessionController};

use vidcast_server::infra::app_state::AppState;
use vidcast_server::infra::config::Config;
use vidcast_server::player::MpvPlayer;
use vidcast_server::resolver::YtDlpResolver;
use vidcast_server::routes;
use vidcast_server::websocket::BroadcastHub;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "vidcast-server")]
#[command(about = "Single-owner video cast server with WebSocket status broadcast")]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long, env = "VIDCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = Arc::new(config);

    let player: Arc<dyn Player> = Arc::new(MpvPlayer::new(config.player.clone()));
    let resolver: Arc<dyn Resolver> = Arc::new(YtDlpResolver::new(config.resolver.clone()));
    let controller = SessionController::new(player, resolver);

    let hub = BroadcastHub::new(
        controller.clone(),
        Duration::from_millis(config.playback.position_sample_ms),
    );
    hub.spawn_fanout();

    let state = AppState {
        controller,
        hub,
        config: config.clone(),
    };
    let app = routes::create_router(state);

    let addr: SocketAddr = config.listen_addr()?;
    info!("HTTP server listening on {addr}");
    info!("WebSocket subscriptions on ws://{addr}/ws");

    axum_server::bind(addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}
