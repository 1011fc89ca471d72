use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use vidcast_core::{ClientIdentity, PlaybackStatus, SessionController};

use super::fixtures::{MockPlayer, MockResolver};
use crate::websocket::{BroadcastHub, ObserverConnection, WsMessage};

fn identity(last: u8) -> ClientIdentity {
    ClientIdentity::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
}

fn setup_hub(
    sample_period_ms: u64,
) -> (Arc<SessionController>, Arc<BroadcastHub>, Arc<MockPlayer>) {
    let player = MockPlayer::new();
    let resolver = MockResolver::new();
    let controller = SessionController::new(player.clone(), resolver);
    let hub = BroadcastHub::new(
        controller.clone(),
        Duration::from_millis(sample_period_ms),
    );
    hub.spawn_fanout();
    (controller, hub, player)
}

async fn subscribe(
    hub: &BroadcastHub,
    identity: ClientIdentity,
) -> mpsc::Receiver<WsMessage> {
    let (tx, rx) = mpsc::channel(64);
    hub.register(Arc::new(ObserverConnection::new(identity, tx))).await;
    rx
}

async fn next_message(rx: &mut mpsc::Receiver<WsMessage>) -> WsMessage {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for hub message")
        .expect("hub channel closed")
}

/// Skip position ticks and return the next status message.
async fn next_status(rx: &mut mpsc::Receiver<WsMessage>) -> (PlaybackStatus, bool) {
    loop {
        if let WsMessage::Status {
            status, is_playing, ..
        } = next_message(rx).await
        {
            return (status, is_playing);
        }
    }
}

#[tokio::test]
async fn broadcasts_published_before_the_fanout_first_runs_are_delivered() {
    let player = MockPlayer::new();
    let resolver = MockResolver::new();
    let controller = SessionController::new(player.clone(), resolver);
    let hub = BroadcastHub::new(controller.clone(), Duration::from_millis(500));

    let mut rx = subscribe(&hub, identity(5)).await;
    hub.spawn_fanout();

    // Single-threaded runtime: both cast broadcasts hit the channel before
    // the fan-out task has ever been polled.
    controller.start_cast("v1", identity(5)).await.unwrap();

    assert_eq!(next_status(&mut rx).await, (PlaybackStatus::Stopped, false));
    assert_eq!(next_status(&mut rx).await, (PlaybackStatus::Stopped, false));
    assert_eq!(next_status(&mut rx).await, (PlaybackStatus::Playing, true));
}

#[tokio::test]
async fn observer_gone_before_initial_snapshot_is_not_kept() {
    let (_controller, hub, _player) = setup_hub(500);

    let (tx, rx) = mpsc::channel(64);
    drop(rx);
    hub.register(Arc::new(ObserverConnection::new(identity(5), tx))).await;

    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshots_are_personalized_per_observer() {
    let (controller, hub, _player) = setup_hub(500);
    let caster = identity(5);

    let mut owner_rx = subscribe(&hub, caster).await;
    let mut other_rx = subscribe(&hub, identity(9)).await;

    // Initial snapshot on connect.
    assert_eq!(
        next_status(&mut owner_rx).await,
        (PlaybackStatus::Stopped, false)
    );
    assert_eq!(
        next_status(&mut other_rx).await,
        (PlaybackStatus::Stopped, false)
    );

    controller.start_cast("v1", caster).await.unwrap();

    // Loading announcement, then ready: both observers see the same status
    // sequence, but only the owner sees isPlaying.
    assert_eq!(
        next_status(&mut owner_rx).await,
        (PlaybackStatus::Stopped, false)
    );
    assert_eq!(
        next_status(&mut owner_rx).await,
        (PlaybackStatus::Playing, true)
    );

    assert_eq!(
        next_status(&mut other_rx).await,
        (PlaybackStatus::Stopped, false)
    );
    assert_eq!(
        next_status(&mut other_rx).await,
        (PlaybackStatus::Playing, false)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn position_ticker_runs_only_for_the_playing_owner() {
    let (controller, hub, player) = setup_hub(25);
    let caster = identity(5);
    player.put_position(33.0);

    let mut owner_rx = subscribe(&hub, caster).await;
    let mut other_rx = subscribe(&hub, identity(9)).await;

    controller.start_cast("v1", caster).await.unwrap();

    // The owner gets position pushes.
    let position = loop {
        if let WsMessage::Position { position } = next_message(&mut owner_rx).await {
            break position;
        }
    };
    assert_eq!(position, 33.0);

    // The non-owner never does.
    sleep(Duration::from_millis(200)).await;
    while let Ok(msg) = other_rx.try_recv() {
        assert!(
            !matches!(msg, WsMessage::Position { .. }),
            "non-owner received a position tick"
        );
    }

    // Pausing stops the ticker.
    controller.pause(&caster).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    while owner_rx.try_recv().is_ok() {}
    sleep(Duration::from_millis(300)).await;
    assert!(
        owner_rx.try_recv().is_err(),
        "ticker kept running while paused"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn dead_connections_are_reaped_on_dispatch() {
    let (controller, hub, _player) = setup_hub(500);
    let caster = identity(5);

    let mut owner_rx = subscribe(&hub, caster).await;
    let other_rx = subscribe(&hub, identity(9)).await;
    assert_eq!(hub.connection_count(), 2);

    drop(other_rx);
    controller.start_cast("v1", caster).await.unwrap();
    // Let the fan-out task observe the failed send.
    sleep(Duration::from_millis(100)).await;

    assert_eq!(hub.connection_count(), 1);
    // The surviving connection still gets updates.
    let (status, _) = next_status(&mut owner_rx).await;
    assert_eq!(status, PlaybackStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread")]
async fn close_event_reaches_every_observer_as_stopped() {
    let (controller, hub, player) = setup_hub(500);
    let caster = identity(5);

    let mut owner_rx = subscribe(&hub, caster).await;
    let mut other_rx = subscribe(&hub, identity(9)).await;

    controller.start_cast("v1", caster).await.unwrap();
    loop {
        if next_status(&mut owner_rx).await.0 == PlaybackStatus::Playing {
            break;
        }
    }
    loop {
        if next_status(&mut other_rx).await.0 == PlaybackStatus::Playing {
            break;
        }
    }

    player.emit_closed();

    assert_eq!(
        next_status(&mut owner_rx).await,
        (PlaybackStatus::Stopped, false)
    );
    assert_eq!(
        next_status(&mut other_rx).await,
        (PlaybackStatus::Stopped, false)
    );
}
