//! Connection state and retry bookkeeping
//!
//! # Connection States
//!
//! - **Idle**: Created, `open()` not called yet
//! - **Connecting**: First attempt in flight
//! - **Connected**: Transport open, subscriptions replayed, heartbeat running
//! - **Reconnecting**: Waiting for a backoff timer, or a retry is in flight
//! - **Disconnected**: Terminal for this session; see `DisconnectReason`
//!
//! # State Transitions
//!
//! ```text
//! Idle → Connecting → Connected ⇄ Reconnecting
//!            ↓                        ↓
//!       Reconnecting           Disconnected (retries exhausted)
//!
//! any state → Disconnected (disposed / closed)
//! ```
//!
//! Only `reconnect()` leaves `Disconnected`, and never once disposed. Host
//! lifecycle signals may also revive a manager whose retries ran out or
//! whose server closed the connection.

use crate::quality::QualityLevel;
use std::time::Duration;

/// Why a manager ended up in `Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The consumer called `disconnect()`
    Closed,
    /// The server closed the connection gracefully
    RemoteClosed,
    /// `max_attempts` retries failed in a row
    RetriesExhausted,
    /// A failure retrying cannot fix, such as an unusable auth token
    Fatal,
    /// The manager was disposed; no operation revives it
    Disposed,
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not opened yet
    Idle,
    /// First connection attempt in progress
    Connecting,
    /// Connected and operational
    Connected,
    /// Recovering from a failure; `attempt` retries have been scheduled so far
    Reconnecting { attempt: u32 },
    /// No connection and no retry scheduled
    Disconnected(DisconnectReason),
}

impl ConnectionState {
    /// Numeric code exported through the connection state gauge
    pub(crate) fn metric_code(&self) -> i64 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
            ConnectionState::Reconnecting { .. } => 3,
            ConnectionState::Disconnected(DisconnectReason::RetriesExhausted) => 4,
            ConnectionState::Disconnected(_) => 5,
        }
    }

    /// Whether the manager will never act again
    pub fn is_disposed(&self) -> bool {
        matches!(self, ConnectionState::Disconnected(DisconnectReason::Disposed))
    }
}

/// Retry counter owned by the manager
///
/// Reset to zero on every successful connect and on explicit or
/// lifecycle-driven reconnects; incremented each time a retry is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt_count: u32,
    last_delay: Duration,
}

impl RetryState {
    /// Retries scheduled since the last reset
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Delay used for the most recent scheduled retry
    pub fn last_delay(&self) -> Duration {
        self.last_delay
    }

    /// Record a newly scheduled retry
    pub fn record(&mut self, delay: Duration) {
        self.attempt_count += 1;
        self.last_delay = delay;
    }

    /// Forget previous failures
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of everything a consumer renders
///
/// Published through a `tokio::sync::watch` channel on every change, so UI
/// code can await `changed()` instead of polling.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    /// Lifecycle state
    pub state: ConnectionState,
    /// Shorthand for `state == Connected`
    pub connected: bool,
    /// True while an attempt is in flight or a retry is pending
    pub connecting: bool,
    /// Most recent failure, cleared on successful connect
    pub error: Option<String>,
    /// Quality of the latest heartbeat round trip
    pub quality: QualityLevel,
    /// Latest heartbeat round trip in milliseconds (0 before the first pong)
    pub latency_ms: u64,
    /// Retries scheduled since the last reset
    pub attempt: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Idle,
            connected: false,
            connecting: false,
            error: None,
            quality: QualityLevel::default(),
            latency_ms: 0,
            attempt: 0,
        }
    }
}

impl ConnectionStatus {
    /// Update the state and the flags derived from it
    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.connected = state == ConnectionState::Connected;
        self.connecting = matches!(
            state,
            ConnectionState::Connecting | ConnectionState::Reconnecting { .. }
        );
    }
}
