//! Resilient real-time room subscriptions over WebSocket
//!
//! This crate provides a connection manager for a persistent, bidirectional
//! socket that delivers push updates. Consumers subscribe to named rooms,
//! listen for application events and emit their own, while the manager keeps
//! the connection alive across network drops and host lifecycle changes.
//!
//! # Core Features
//!
//! - **Auto-Reconnection**: exponential backoff with optional jitter and a
//!   hard attempt budget
//! - **Heartbeat**: ping/pong liveness probing that catches silently dead
//!   connections and measures round-trip time
//! - **Connection Quality**: Excellent/Good/Fair/Poor from the latest RTT
//! - **Subscription Replay**: the desired room set is re-requested on every
//!   connect, before the manager reports itself connected
//! - **Durable Listeners**: registered once, kept across reconnects
//! - **Lifecycle Port**: foreground/background, online/offline and
//!   restored-from-cache signals from any host
//! - **Observability**: tracing spans and OpenTelemetry metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use roomlink_client::ManagerBuilder;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct DnsStatus {
//!     healthy: bool,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ManagerBuilder::new("ws://localhost:3001")
//!         .namespace("/dns")
//!         .build()?;
//!
//!     manager.subscribe("dns");
//!     manager
//!         .on_typed("dns-status", |status: DnsStatus| {
//!             println!("healthy: {}", status.healthy);
//!         })
//!         .await?;
//!
//!     manager.wait_for(|s| s.connected).await;
//!     manager.emit("dns-check", serde_json::json!({"host": "1.1.1.1"})).await;
//!
//!     manager.dispose().await;
//!     Ok(())
//! }
//! ```

mod backoff;
mod builder;
mod config;
mod connection_state;
mod heartbeat;
mod lifecycle;
mod listeners;
mod manager;
mod metrics;
mod quality;
mod store;
mod subscription;
mod transport;

pub use backoff::BackoffPolicy;
pub use builder::ManagerBuilder;
pub use config::ManagerConfig;
pub use connection_state::{ConnectionState, ConnectionStatus, DisconnectReason, RetryState};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatMonitor, Liveness};
pub use lifecycle::{ChannelLifecycle, LifecycleObserver, LifecyclePort, LifecycleSignal};
pub use listeners::{listener, Listener, ListenerTable};
pub use manager::ConnectionManager;
pub use metrics::ClientMetrics;
pub use quality::{classify, LatencyWindow, QualityLevel};
pub use store::{last_connected_at, last_connected_key, KeyValueStore, MemoryStore};
pub use subscription::SubscriptionRegistry;
pub use transport::{
    CloseKind, Endpoint, LinkPeer, Transport, TransportEvent, TransportLink, WsTransport,
};
