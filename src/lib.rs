//! roomlink - resilient real-time room subscriptions
//!
//! This is the convenience crate that re-exports the roomlink sub-crates.
//! Depend on it when you want the whole client through one dependency.
//!
//! # Architecture
//!
//! - **roomlink-core**: frame envelope, codec, error handling, observability
//! - **roomlink-client**: connection manager, WebSocket transport, backoff,
//!   heartbeat, lifecycle and subscription handling
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use roomlink::{listener, ManagerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ManagerBuilder::new("ws://localhost:3001")
//!         .namespace("/dns")
//!         .build()?;
//!
//!     manager.subscribe("dns");
//!     manager
//!         .on("dns-status", listener(|frame| println!("{}", frame.data)))
//!         .await?;
//!
//!     let mut status = manager.watch();
//!     while status.changed().await.is_ok() {
//!         let current = status.borrow().clone();
//!         println!("{:?} quality={:?}", current.state, current.quality);
//!     }
//!     Ok(())
//! }
//! ```

// Re-export the sub-crates under short names
pub use roomlink_client as client;
pub use roomlink_core as core;

// Most commonly used types at the top level
pub use roomlink_client::{
    listener, ChannelLifecycle, ConnectionManager, ConnectionState, ConnectionStatus,
    LifecycleSignal, ManagerBuilder, ManagerConfig, QualityLevel,
};
pub use roomlink_core::{Error, Frame, Result};
