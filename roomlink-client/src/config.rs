//! Connection manager configuration
//!
//! Every option has a default, so hosts only set what differs. The struct
//! derives `Deserialize` with `#[serde(default)]`, which lets a host load it
//! from whatever format its settings live in:
//!
//! ```rust
//! use roomlink_client::ManagerConfig;
//!
//! let config: ManagerConfig = serde_json::from_str(r#"{
//!     "url": "ws://dashboard.local:3001",
//!     "namespace": "/dns",
//!     "max_attempts": 5
//! }"#).unwrap();
//!
//! assert_eq!(config.max_attempts, 5);
//! assert_eq!(config.heartbeat_interval_ms, 25_000);
//! config.validate().unwrap();
//! ```

use crate::backoff::BackoffPolicy;
use crate::heartbeat::HeartbeatConfig;
use crate::transport::Endpoint;
use roomlink_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options recognized by the connection manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Server base URL
    pub url: String,
    /// Logical namespace; one manager per namespace
    pub namespace: String,
    /// Allowed transports; only `"websocket"` is implemented
    pub transports: Vec<String>,
    /// Open as soon as the manager is built
    pub auto_connect: bool,
    /// Handshake deadline
    pub timeout_ms: u64,
    /// First retry delay
    pub initial_delay_ms: u64,
    /// Retry delay ceiling
    pub max_delay_ms: u64,
    /// Retry delay growth factor, greater than 1
    pub multiplier: f64,
    /// Retries before giving up
    pub max_attempts: u32,
    /// Scale retry delays by a random factor in [0.5, 1.0]
    pub jitter: bool,
    /// Heartbeat period while foregrounded
    pub heartbeat_interval_ms: u64,
    /// How long a heartbeat waits for its pong
    pub heartbeat_timeout_ms: u64,
    /// Unanswered heartbeats that declare the connection dead
    pub max_missed_heartbeats: u32,
    /// Heartbeat period while backgrounded
    pub background_heartbeat_interval_ms: u64,
    /// Round-trip samples kept for `latency_history`
    pub latency_history: usize,
    /// Bearer token presented during the handshake
    pub auth_token: Option<String>,
    /// Application event names listeners may register for; empty accepts any
    pub events: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080".to_string(),
            namespace: "/".to_string(),
            transports: vec!["websocket".to_string()],
            auto_connect: true,
            timeout_ms: 20_000,
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
            multiplier: 1.3,
            max_attempts: 10,
            jitter: true,
            heartbeat_interval_ms: 25_000,
            heartbeat_timeout_ms: 10_000,
            max_missed_heartbeats: 2,
            background_heartbeat_interval_ms: 300_000,
            latency_history: 20,
            auth_token: None,
            events: Vec::new(),
        }
    }
}

impl ManagerConfig {
    /// Default configuration for `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Reject option combinations the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));

        if self.url.is_empty() {
            return invalid("url must not be empty");
        }
        if !self.namespace.starts_with('/') {
            return invalid("namespace must start with '/'");
        }
        if self.transports.is_empty() {
            return invalid("at least one transport is required");
        }
        if !self.transports.iter().any(|t| t == "websocket") {
            return invalid("only the \"websocket\" transport is supported");
        }
        if !(self.multiplier > 1.0) {
            return invalid("multiplier must be greater than 1");
        }
        if self.initial_delay_ms == 0 {
            return invalid("initial_delay_ms must be positive");
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return invalid("max_delay_ms must be at least initial_delay_ms");
        }
        if self.timeout_ms == 0 {
            return invalid("timeout_ms must be positive");
        }
        if self.heartbeat_interval_ms == 0
            || self.heartbeat_timeout_ms == 0
            || self.background_heartbeat_interval_ms == 0
        {
            return invalid("heartbeat intervals and timeout must be positive");
        }
        if self.max_missed_heartbeats == 0 {
            return invalid("max_missed_heartbeats must be at least 1");
        }
        Ok(())
    }

    /// Retry policy described by this configuration
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .with_multiplier(self.multiplier)
        .with_max_attempts(self.max_attempts)
        .with_jitter(self.jitter)
    }

    /// Heartbeat timing described by this configuration
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_millis(self.heartbeat_interval_ms),
            background_interval: Duration::from_millis(self.background_heartbeat_interval_ms),
            timeout: Duration::from_millis(self.heartbeat_timeout_ms),
            max_missed: self.max_missed_heartbeats,
        }
    }

    /// Transport endpoint described by this configuration
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            url: self.url.clone(),
            namespace: self.namespace.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            auth_token: self.auth_token.clone(),
        }
    }
}
