use axum::{
    Router,
    http::{HeaderName, Method},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::cast_handlers;
use crate::infra::app_state::AppState;
use crate::websocket;

/// Route table for the remote-control protocol. Endpoint names predate this
/// implementation and are kept verbatim for existing remotes; `/volumeUp`
/// and `/volumeDown` are deprecated aliases still in the wild.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/cast", get(cast_handlers::cast))
        .route("/play", get(cast_handlers::play))
        .route("/pause", get(cast_handlers::pause))
        .route("/togglePause", get(cast_handlers::toggle_pause))
        .route("/quit", get(cast_handlers::quit))
        .route("/seek", get(cast_handlers::seek))
        .route("/skipForward", get(cast_handlers::skip_forward))
        .route("/skipBackwards", get(cast_handlers::skip_backwards))
        .route("/getPosition", get(cast_handlers::get_position))
        .route("/setPosition", post(cast_handlers::set_position))
        .route("/getVolume", get(cast_handlers::get_volume))
        .route("/setVolume", post(cast_handlers::set_volume))
        .route("/increaseVolume", get(cast_handlers::increase_volume))
        .route("/decreaseVolume", get(cast_handlers::decrease_volume))
        .route("/volumeUp", get(cast_handlers::increase_volume))
        .route("/volumeDown", get(cast_handlers::decrease_volume))
        .route("/increaseSpeed", get(cast_handlers::increase_speed))
        .route("/decreaseSpeed", get(cast_handlers::decrease_speed))
        .route("/showSubtitles", get(cast_handlers::show_subtitles))
        .route("/hideSubtitles", get(cast_handlers::hide_subtitles))
        .route("/getDuration", get(cast_handlers::get_duration))
        .route("/isPlaying", get(cast_handlers::is_playing))
        .route("/getVersion", get(cast_handlers::get_version))
        .route("/ws", get(websocket::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(AllowMethods::list([Method::GET, Method::POST]))
        .allow_headers(AllowHeaders::list([HeaderName::from_static(
            "x-requested-with",
        )]))
}
