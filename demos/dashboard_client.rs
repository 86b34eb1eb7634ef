//! Dashboard client example
//!
//! Connects to a roomlink server, subscribes to the DNS and Google rooms,
//! logs typed events and status transitions, and lets you drive host
//! lifecycle signals from stdin:
//!
//! ```text
//! fg | bg | online | offline | restored   lifecycle signals
//! sub <room> | unsub <room>               change subscriptions
//! check <host>                            emit a dns-check event
//! retry | close | quit
//! ```
//!
//! Run with: cargo run --example dashboard_client -- ws://127.0.0.1:3001

use roomlink::{ChannelLifecycle, LifecycleSignal, ManagerBuilder};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Deserialize)]
struct DnsStatus {
    server: String,
    healthy: bool,
    #[serde(default)]
    response_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GoogleUpdate {
    clicks: u64,
    impressions: u64,
}

fn parse_signal(word: &str) -> Option<LifecycleSignal> {
    match word {
        "fg" => Some(LifecycleSignal::Foregrounded),
        "bg" => Some(LifecycleSignal::Backgrounded),
        "online" => Some(LifecycleSignal::Online),
        "offline" => Some(LifecycleSignal::Offline),
        "restored" => Some(LifecycleSignal::Restored),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,roomlink_client=debug".into()),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:3001".to_string());

    let host = ChannelLifecycle::new();
    let manager = ManagerBuilder::new(&url)
        .namespace("/dashboard")
        .events(["dns-status", "google-update"])
        .heartbeat_interval_ms(5_000)
        .with_lifecycle(host.clone())
        .build()?;

    manager.subscribe("dns");
    manager.subscribe("google");

    manager
        .on_typed("dns-status", |status: DnsStatus| {
            println!(
                "[dns] {} healthy={} response={:?}ms",
                status.server, status.healthy, status.response_ms
            );
        })
        .await?;
    manager
        .on_typed("google-update", |update: GoogleUpdate| {
            println!(
                "[google] clicks={} impressions={}",
                update.clicks, update.impressions
            );
        })
        .await?;

    // Status transitions
    let mut status = manager.watch();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            println!(
                "[status] {:?} quality={:?} latency={}ms attempt={} error={:?}",
                current.state, current.quality, current.latency_ms, current.attempt, current.error
            );
        }
    });

    println!("Connecting to {}", url);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("quit"), _) => break,
            (Some("retry"), _) => manager.reconnect(),
            (Some("close"), _) => manager.disconnect(),
            (Some("sub"), Some(room)) => manager.subscribe(room),
            (Some("unsub"), Some(room)) => manager.unsubscribe(room),
            (Some("check"), Some(host_name)) => {
                let sent = manager
                    .emit("dns-check", serde_json::json!({ "host": host_name }))
                    .await;
                println!("dns-check sent: {}", sent);
            }
            (Some(word), None) if parse_signal(word).is_some() => {
                if let Some(signal) = parse_signal(word) {
                    host.notify(signal);
                }
            }
            (Some(other), _) => println!("Unknown command: {}", other),
            (None, _) => {}
        }
    }

    println!("Subscriptions at exit: {:?}", manager.subscriptions().await);
    manager.dispose().await;
    Ok(())
}
