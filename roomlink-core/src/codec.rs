//! Codec for frame serialization and deserialization
//!
//! Frames travel as JSON text messages. This module keeps the mapping from
//! serde errors to the crate `Error` in one place and adds typed payload
//! extraction for listeners that want a concrete struct instead of a
//! `serde_json::Value`.
//!
//! # Examples
//!
//! ```rust
//! use roomlink_core::{codec, Frame};
//!
//! let frame = Frame::subscribe("dns");
//! let text = codec::encode(&frame).unwrap();
//!
//! let decoded = codec::decode(&text).unwrap();
//! assert_eq!(decoded.room(), Some("dns"));
//! ```

use crate::error::{Error, Result};
use crate::types::Frame;
use serde::de::DeserializeOwned;

/// Encode a frame to a JSON text message
pub fn encode(frame: &Frame) -> Result<String> {
    serde_json::to_string(frame).map_err(|e| Error::Serialization(e.to_string()))
}

/// Decode a JSON text message into a frame
///
/// # Errors
///
/// Returns `Error::Serialization` if the text is not JSON or lacks an
/// `event` string.
pub fn decode(text: &str) -> Result<Frame> {
    serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
}

/// Deserialize a frame's payload into a concrete type
pub fn decode_data<T: DeserializeOwned>(frame: &Frame) -> Result<T> {
    T::deserialize(&frame.data)
        .map_err(|e| Error::Serialization(format!("{}: {}", frame.event, e)))
}
