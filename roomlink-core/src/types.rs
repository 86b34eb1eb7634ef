//! Frame envelope exchanged with the real-time server
//!
//! Every message on the wire is a single JSON text frame carrying an event
//! name and an arbitrary payload:
//!
//! ```json
//! {"event": "dns-status", "data": {"healthy": true}}
//! ```
//!
//! The shape of `data` belongs to the application. The manager only
//! interprets its own reserved events:
//!
//! - `ping` / `pong`: liveness probes, `data` is `{"ts": <ms>}` and the server
//!   echoes it back unchanged
//! - `subscribe` / `unsubscribe`: room membership, `data` is `{"room": "<name>"}`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Heartbeat probe sent by the client
pub const PING_EVENT: &str = "ping";
/// Heartbeat reply echoed by the server
pub const PONG_EVENT: &str = "pong";
/// Join a room
pub const SUBSCRIBE_EVENT: &str = "subscribe";
/// Leave a room
pub const UNSUBSCRIBE_EVENT: &str = "unsubscribe";

/// Event names the manager owns. Application code may neither listen for
/// nor emit these.
pub const RESERVED_EVENTS: &[&str] = &[PING_EVENT, PONG_EVENT, SUBSCRIBE_EVENT, UNSUBSCRIBE_EVENT];

/// Returns true if `event` is one of the manager's own event names
pub fn is_reserved(event: &str) -> bool {
    RESERVED_EVENTS.contains(&event)
}

/// A single message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name used for dispatch
    pub event: String,
    /// Event payload; `null` when the sender omitted it
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    /// Create a frame for an application event
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Heartbeat probe carrying the send timestamp in milliseconds
    pub fn ping(ts: u64) -> Self {
        Self::new(PING_EVENT, serde_json::json!({ "ts": ts }))
    }

    /// Server reply to a probe; used by test servers and fakes
    pub fn pong(ts: u64) -> Self {
        Self::new(PONG_EVENT, serde_json::json!({ "ts": ts }))
    }

    /// Room join request
    pub fn subscribe(room: &str) -> Self {
        Self::new(SUBSCRIBE_EVENT, serde_json::json!({ "room": room }))
    }

    /// Room leave request
    pub fn unsubscribe(room: &str) -> Self {
        Self::new(UNSUBSCRIBE_EVENT, serde_json::json!({ "room": room }))
    }

    /// Whether this frame is a heartbeat reply
    pub fn is_pong(&self) -> bool {
        self.event == PONG_EVENT
    }

    /// Timestamp echoed in a `pong` (or carried by a `ping`)
    pub fn pong_timestamp(&self) -> Option<u64> {
        self.data.get("ts").and_then(serde_json::Value::as_u64)
    }

    /// Room named by a `subscribe`/`unsubscribe` frame
    pub fn room(&self) -> Option<&str> {
        self.data.get("room").and_then(serde_json::Value::as_str)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.event, self.data)
    }
}
