//! Core frame types and codec for roomlink
//!
//! This crate holds the pieces shared by everything that speaks the
//! roomlink wire format:
//!
//! - **Types**: the `Frame` envelope and the reserved event names
//! - **Codec**: JSON text encoding/decoding and typed payload extraction
//! - **Error handling**: the crate-wide `Error` and `Result`
//! - **Observability**: tracing subscriber and OpenTelemetry setup
//!
//! # Example
//!
//! ```rust
//! use roomlink_core::{codec, Frame};
//!
//! let frame = Frame::new("dns-status", serde_json::json!({"healthy": true}));
//! let text = codec::encode(&frame).unwrap();
//!
//! let decoded = codec::decode(&text).unwrap();
//! assert_eq!(decoded.event, "dns-status");
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{is_reserved, Frame};
