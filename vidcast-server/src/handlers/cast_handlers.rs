use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, Query, State},
};
use serde::Serialize;
use vidcast_core::{ClientIdentity, PlaybackStatus, StatusCode};

use crate::VERSION;
use crate::errors::{ApiError, ApiResult};
use crate::infra::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct AckResponse {
    status: StatusCode,
}

impl AckResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: StatusCode::Success,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CastResponse {
    status: StatusCode,
    duration: f64,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    status: StatusCode,
    position: f64,
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    status: StatusCode,
    volume: f64,
}

#[derive(Debug, Serialize)]
pub struct DurationResponse {
    status: StatusCode,
    duration: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IsPlayingResponse {
    status: StatusCode,
    is_playing: bool,
    playback: PlaybackStatus,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    status: StatusCode,
    version: &'static str,
}

/// Parse a required query parameter as a finite number. Malformed input is
/// rejected here, before the controller is ever involved.
fn required_f64(params: &HashMap<String, String>, key: &str) -> ApiResult<f64> {
    params
        .get(key)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(ApiError::invalid_parameters)
}

fn identity(addr: SocketAddr) -> ClientIdentity {
    ClientIdentity::from(addr)
}

/// Start (or supersede) a cast. Exactly one terminal response per request:
/// success with the duration, a specific failure code, or `Superseded` when
/// a newer cast won the race while this one was resolving.
pub async fn cast(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<CastResponse>> {
    let video = params
        .get("video")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(ApiError::invalid_parameters)?;

    let started = state.controller.start_cast(video, identity(addr)).await?;
    Ok(Json(CastResponse {
        status: StatusCode::Success,
        duration: started.duration,
        version: VERSION,
    }))
}

pub async fn play(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.play(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn pause(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.pause(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn toggle_pause(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.toggle_pause(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn quit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.quit(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn seek(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<AckResponse>> {
    let offset = required_f64(&params, "offset")?;
    state.controller.seek(&identity(addr), offset).await?;
    Ok(AckResponse::ok())
}

pub async fn skip_forward(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    let step = state.config.playback.seek_step_secs;
    state.controller.seek(&identity(addr), step).await?;
    Ok(AckResponse::ok())
}

pub async fn skip_backwards(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    let step = state.config.playback.seek_step_secs;
    state.controller.seek(&identity(addr), -step).await?;
    Ok(AckResponse::ok())
}

pub async fn get_position(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<PositionResponse>> {
    let position = state.controller.position(&identity(addr)).await?;
    Ok(Json(PositionResponse {
        status: StatusCode::Success,
        position,
    }))
}

pub async fn set_position(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<PositionResponse>> {
    let target = required_f64(&params, "position")?;
    let position = state.controller.set_position(&identity(addr), target).await?;
    Ok(Json(PositionResponse {
        status: StatusCode::Success,
        position,
    }))
}

pub async fn get_volume(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<VolumeResponse>> {
    let volume = state.controller.volume(&identity(addr)).await?;
    Ok(Json(VolumeResponse {
        status: StatusCode::Success,
        volume,
    }))
}

pub async fn set_volume(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<VolumeResponse>> {
    let target = required_f64(&params, "volume")?;
    let volume = state.controller.set_volume(&identity(addr), target).await?;
    Ok(Json(VolumeResponse {
        status: StatusCode::Success,
        volume,
    }))
}

pub async fn increase_volume(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.increase_volume(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn decrease_volume(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.decrease_volume(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn increase_speed(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.increase_speed(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn decrease_speed(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.decrease_speed(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn show_subtitles(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.show_subtitles(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn hide_subtitles(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<AckResponse>> {
    state.controller.hide_subtitles(&identity(addr)).await?;
    Ok(AckResponse::ok())
}

pub async fn get_duration(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> ApiResult<Json<DurationResponse>> {
    let duration = state.controller.duration(&identity(addr)).await?;
    Ok(Json(DurationResponse {
        status: StatusCode::Success,
        duration,
    }))
}

/// Status query, never a rejection: observers poll this before and during
/// casts. The playing flag is personalized to the caller.
pub async fn is_playing(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Json<IsPlayingResponse> {
    let identity = identity(addr);
    let snapshot = state.controller.snapshot().await;
    Json(IsPlayingResponse {
        status: StatusCode::Success,
        is_playing: state.controller.is_playing_for(&identity).await,
        playback: snapshot.status,
    })
}

pub async fn get_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        status: StatusCode::Success,
        version: VERSION,
    })
}
