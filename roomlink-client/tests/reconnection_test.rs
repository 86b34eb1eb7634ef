//! Reconnection integration tests
//!
//! Backoff scheduling, retry exhaustion, heartbeat failure and close
//! semantics, on paused time against the scripted transport.

mod common;

use common::{close, deliver, drain_frames, settle, ScriptedTransport};
use roomlink_client::{
    CloseKind, ConnectionState, DisconnectReason, ManagerBuilder, QualityLevel,
};
use roomlink_core::Frame;
use std::time::Duration;
use tokio::time::Instant;

fn builder(transport: &ScriptedTransport) -> ManagerBuilder {
    ManagerBuilder::new("ws://scripted.test")
        .jitter(false)
        .with_transport(transport.clone())
}

fn gaps_ms(times: &[Instant]) -> Vec<u64> {
    times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_millis() as u64)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_backoff_schedule_then_exhaustion() {
    let transport = ScriptedTransport::failing();
    let manager = builder(&transport)
        .initial_delay_ms(2_000)
        .multiplier(1.3)
        .max_attempts(3)
        .build()
        .unwrap();

    let status = manager
        .wait_for(|s| matches!(s.state, ConnectionState::Disconnected(_)))
        .await
        .unwrap();
    assert_eq!(
        status.state,
        ConnectionState::Disconnected(DisconnectReason::RetriesExhausted)
    );
    assert!(!status.connecting);
    assert!(status.error.unwrap().contains("3 attempts"));

    // Initial open plus three retries
    let times = transport.open_times();
    assert_eq!(times.len(), 4);
    let gaps = gaps_ms(&times);
    for (gap, expected) in gaps.iter().zip([2_000u64, 2_600, 3_380]) {
        assert!(
            *gap >= expected && *gap <= expected + 1,
            "gap {gap}ms, expected {expected}ms"
        );
    }

    // Nothing else is scheduled
    tokio::time::sleep(Duration::from_secs(3_600)).await;
    assert_eq!(transport.open_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_retry_counter_visible_while_reconnecting() {
    let transport = ScriptedTransport::failing();
    let manager = builder(&transport).max_attempts(5).build().unwrap();

    let status = manager
        .wait_for(|s| s.state == ConnectionState::Reconnecting { attempt: 2 })
        .await
        .unwrap();
    assert!(status.connecting);
    assert!(!status.connected);
    assert_eq!(status.attempt, 2);
    assert_eq!(status.error.as_deref(), Some("WebSocket error: connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_retry_counter_resets_after_success() {
    let transport = ScriptedTransport::failing();
    let manager = builder(&transport).build().unwrap();

    manager
        .wait_for(|s| s.state == ConnectionState::Reconnecting { attempt: 2 })
        .await
        .unwrap();
    transport.set_failing(false);

    let status = manager.wait_for(|s| s.connected).await.unwrap();
    assert_eq!(status.attempt, 0);
    assert!(status.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_exhaustion_schedules_retry() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport)
        .heartbeat_interval_ms(25_000)
        .heartbeat_timeout_ms(10_000)
        .max_missed_heartbeats(2)
        .build()
        .unwrap();

    let mut peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();
    let connected_at = Instant::now();

    // The peer never answers
    let ping = peer.outgoing.recv().await.unwrap();
    assert_eq!(ping.event, "ping");

    let status = manager
        .wait_for(|s| matches!(s.state, ConnectionState::Reconnecting { .. }))
        .await
        .unwrap();
    assert_eq!(status.attempt, 1);
    assert!(status.error.is_some());

    // Probe at 25s misses at 35s, probe at 50s misses at 60s
    let elapsed = connected_at.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));

    let _second = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();
    assert_eq!(transport.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pongs_keep_connection_and_measure_latency() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport)
        .heartbeat_interval_ms(1_000)
        .heartbeat_timeout_ms(500)
        .build()
        .unwrap();

    let mut peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();

    for rtt_ms in [20u64, 120, 400] {
        let ping = peer.outgoing.recv().await.unwrap();
        assert_eq!(ping.event, "ping");
        tokio::time::advance(Duration::from_millis(rtt_ms)).await;
        deliver(&peer, Frame::new("pong", ping.data.clone()));

        let status = manager
            .wait_for(|s| s.latency_ms == rtt_ms)
            .await
            .unwrap();
        assert!(status.connected);
    }

    // Each pong arrived inside the 500ms deadline
    let status = manager.status();
    assert_eq!(status.quality, QualityLevel::Poor);
    assert_eq!(
        manager.latency_history().await,
        vec![
            Duration::from_millis(20),
            Duration::from_millis(120),
            Duration::from_millis(400)
        ]
    );
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_quality_follows_latest_sample() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport)
        .heartbeat_interval_ms(1_000)
        .build()
        .unwrap();
    assert_eq!(manager.status().quality, QualityLevel::Good);

    let mut peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();

    let ping = peer.outgoing.recv().await.unwrap();
    tokio::time::advance(Duration::from_millis(200)).await;
    deliver(&peer, Frame::new("pong", ping.data.clone()));
    let status = manager.wait_for(|s| s.latency_ms == 200).await.unwrap();
    assert_eq!(status.quality, QualityLevel::Fair);

    let ping = peer.outgoing.recv().await.unwrap();
    tokio::time::advance(Duration::from_millis(10)).await;
    deliver(&peer, Frame::new("pong", ping.data.clone()));
    let status = manager.wait_for(|s| s.latency_ms == 10).await.unwrap();
    assert_eq!(status.quality, QualityLevel::Excellent);
}

#[tokio::test(start_paused = true)]
async fn test_unsolicited_pong_leaves_latency_alone() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport)
        .heartbeat_interval_ms(1_000)
        .build()
        .unwrap();

    let mut peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();
    tokio::time::advance(Duration::from_millis(500)).await;

    deliver(&peer, Frame::pong(0));
    settle().await;
    let status = manager.status();
    assert_eq!(status.latency_ms, 0);
    assert_eq!(status.quality, QualityLevel::Good);

    // The real probe still measures normally
    let ping = peer.outgoing.recv().await.unwrap();
    tokio::time::advance(Duration::from_millis(30)).await;
    deliver(&peer, Frame::new("pong", ping.data.clone()));
    let status = manager.wait_for(|s| s.latency_ms == 30).await.unwrap();
    assert_eq!(status.quality, QualityLevel::Excellent);
    assert_eq!(
        manager.latency_history().await,
        vec![Duration::from_millis(30)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_graceful_remote_close_not_retried() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport).build().unwrap();

    let peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();
    close(&peer, CloseKind::Normal);

    let status = manager
        .wait_for(|s| !s.connected)
        .await
        .unwrap();
    assert_eq!(
        status.state,
        ConnectionState::Disconnected(DisconnectReason::RemoteClosed)
    );

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abnormal_close_retried_with_backoff() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport).initial_delay_ms(2_000).build().unwrap();

    let peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();
    let dropped_at = Instant::now();
    close(&peer, CloseKind::Abnormal("close code 1011: internal error".into()));

    let status = manager
        .wait_for(|s| matches!(s.state, ConnectionState::Reconnecting { .. }))
        .await
        .unwrap();
    assert_eq!(status.attempt, 1);

    let _second = transport.next_peer().await;
    assert!(dropped_at.elapsed() >= Duration::from_millis(2_000));
    manager.wait_for(|s| s.connected).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_transport_vanishing_is_abnormal() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport).build().unwrap();

    let peer = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();
    drop(peer);

    manager
        .wait_for(|s| matches!(s.state, ConnectionState::Reconnecting { .. }))
        .await
        .unwrap();
    let _second = transport.next_peer().await;
    assert_eq!(transport.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_cancels_pending_retry() {
    let transport = ScriptedTransport::failing();
    let manager = builder(&transport).build().unwrap();

    manager
        .wait_for(|s| s.state == ConnectionState::Reconnecting { attempt: 1 })
        .await
        .unwrap();
    transport.set_failing(false);
    manager.reconnect();

    let _peer = transport.next_peer().await;
    let status = manager.wait_for(|s| s.connected).await.unwrap();
    assert_eq!(status.attempt, 0);

    // Immediate, not after the 2s backoff
    let times = transport.open_times();
    assert_eq!(gaps_ms(&times), vec![0]);

    // The cancelled timer never fires
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_replaces_live_connection() {
    let transport = ScriptedTransport::new();
    let manager = builder(&transport).build().unwrap();
    manager.subscribe("dns");

    let mut first = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();

    manager.reconnect();
    let mut second = transport.next_peer().await;
    manager.wait_for(|s| s.connected).await.unwrap();

    // Old link released, subscriptions replayed on the new one
    drain_frames(&mut first);
    assert_eq!(first.outgoing.recv().await, None);
    let replayed: Vec<Frame> = drain_frames(&mut second)
        .into_iter()
        .filter(|f| f.event == "subscribe")
        .collect();
    assert_eq!(replayed, vec![Frame::subscribe("dns")]);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_exhaustion() {
    let transport = ScriptedTransport::failing();
    let manager = builder(&transport).max_attempts(1).build().unwrap();

    manager
        .wait_for(|s| {
            s.state == ConnectionState::Disconnected(DisconnectReason::RetriesExhausted)
        })
        .await
        .unwrap();
    assert_eq!(transport.open_count(), 2);

    transport.set_failing(false);
    manager.reconnect();
    let status = manager.wait_for(|s| s.connected).await.unwrap();
    assert_eq!(status.attempt, 0);
    assert_eq!(transport.open_count(), 3);
}
