use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use super::fixtures::{spawn_server, test_state};
use crate::VERSION;

async fn get_json(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

async fn post_json(url: &str) -> (u16, Value) {
    let client = reqwest::Client::new();
    let response = client.post(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn commands_before_any_cast_report_no_cast() {
    let (state, _player, _resolver) = test_state(500);
    let addr = spawn_server(state);

    for endpoint in ["play", "pause", "quit", "getPosition", "increaseVolume"] {
        let (http, body) = get_json(&format!("http://{addr}/{endpoint}")).await;
        assert_eq!(http, 200, "{endpoint} should not be an HTTP failure");
        assert_eq!(body["status"], 103, "{endpoint} should report no cast");
    }

    let (_, body) = get_json(&format!("http://{addr}/isPlaying")).await;
    assert_eq!(body["status"], 0);
    assert_eq!(body["isPlaying"], false);
    assert_eq!(body["playback"], "stopped");
}

#[tokio::test(flavor = "multi_thread")]
async fn cast_requires_a_video_reference() {
    let (state, _player, _resolver) = test_state(500);
    let addr = spawn_server(state);

    let (http, body) = get_json(&format!("http://{addr}/cast")).await;
    assert_eq!(http, 400);
    assert_eq!(body["status"], 101);

    let (http, body) = get_json(&format!("http://{addr}/cast?video=")).await;
    assert_eq!(http, 400);
    assert_eq!(body["status"], 101);
}

#[tokio::test(flavor = "multi_thread")]
async fn cast_and_control_round_trip() {
    let (state, player, _resolver) = test_state(500);
    let addr = spawn_server(state);

    let (http, body) = get_json(&format!("http://{addr}/cast?video=v1")).await;
    assert_eq!(http, 200);
    assert_eq!(body["status"], 0);
    assert_eq!(body["duration"], 120.0);
    assert_eq!(body["version"], VERSION);

    // The test client and the caster share 127.0.0.1, so control works.
    let (_, body) = get_json(&format!("http://{addr}/pause")).await;
    assert_eq!(body["status"], 0);

    let (_, body) = get_json(&format!("http://{addr}/isPlaying")).await;
    assert_eq!(body["playback"], "paused");
    assert_eq!(body["isPlaying"], false);

    player.put_position(-2.0);
    let (_, body) = get_json(&format!("http://{addr}/getPosition")).await;
    assert_eq!(body["position"], 0.0, "negative positions are clamped");

    let (_, body) = post_json(&format!("http://{addr}/setPosition?position=5.5")).await;
    assert_eq!(body["status"], 0);
    assert_eq!(body["position"], 5.5);

    let (_, body) = get_json(&format!("http://{addr}/skipForward")).await;
    assert_eq!(body["status"], 0);
    assert!(player.calls().contains(&"seek:30".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_numbers_are_rejected_at_the_gateway() {
    let (state, player, _resolver) = test_state(500);
    let addr = spawn_server(state);

    get_json(&format!("http://{addr}/cast?video=v1")).await;
    let calls_before = player.calls().len();

    let (http, body) = get_json(&format!("http://{addr}/seek?offset=abc")).await;
    assert_eq!(http, 400);
    assert_eq!(body["status"], 101);

    let (http, body) = post_json(&format!("http://{addr}/setPosition?position=NaN")).await;
    assert_eq!(http, 400);
    assert_eq!(body["status"], 101);

    let (http, body) = post_json(&format!("http://{addr}/setVolume")).await;
    assert_eq!(http, 400);
    assert_eq!(body["status"], 101);

    assert_eq!(
        player.calls().len(),
        calls_before,
        "rejected input must never reach the player"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn commands_during_loading_report_cast_loading() {
    let (state, _player, resolver) = test_state(500);
    let gate = resolver.gate("v1");
    let addr = spawn_server(state);

    let pending = tokio::spawn(async move { get_json(&format!("http://{addr}/cast?video=v1")).await });
    sleep(Duration::from_millis(50)).await;

    let (http, body) = get_json(&format!("http://{addr}/play")).await;
    assert_eq!(http, 200);
    assert_eq!(body["status"], 104);

    gate.notify_one();
    let (http, body) = pending.await.unwrap();
    assert_eq!(http, 200);
    assert_eq!(body["status"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn superseded_cast_receives_exactly_one_terminal_response() {
    let (state, player, resolver) = test_state(500);
    let gate = resolver.gate("v1");
    let addr = spawn_server(state);

    let first = tokio::spawn(async move { get_json(&format!("http://{addr}/cast?video=v1")).await });
    sleep(Duration::from_millis(50)).await;

    let (http, body) = get_json(&format!("http://{addr}/cast?video=v2")).await;
    assert_eq!(http, 200);
    assert_eq!(body["status"], 0);

    gate.notify_one();
    let (http, body) = first.await.unwrap();
    assert_eq!(http, 409);
    assert_eq!(body["status"], 106, "the losing cast gets the superseded code");

    let calls = player.calls();
    assert!(calls.contains(&"load:stream://v2".to_string()));
    assert!(!calls.contains(&"load:stream://v1".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn version_endpoint_reports_package_version() {
    let (state, _player, _resolver) = test_state(500);
    let addr = spawn_server(state);

    let (http, body) = get_json(&format!("http://{addr}/getVersion")).await;
    assert_eq!(http, 200);
    assert_eq!(body["status"], 0);
    assert_eq!(body["version"], VERSION);
}
