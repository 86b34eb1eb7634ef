//! Host key/value storage port
//!
//! The manager stashes a "last connected at" timestamp per namespace for
//! diagnostics. Nothing reads it back for correctness, so a host without
//! persistent storage can keep the in-memory default.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persistent string key/value store provided by the host
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

/// Process-local store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.entries.read() {
            Ok(entries) => entries.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn set(&self, key: &str, value: String) {
        match self.entries.write() {
            Ok(mut entries) => entries.insert(key.to_string(), value),
            Err(poisoned) => poisoned.into_inner().insert(key.to_string(), value),
        };
    }
}

/// Key under which the last successful connect time is stored
pub fn last_connected_key(namespace: &str) -> String {
    format!("roomlink:{}:last_connected_at", namespace)
}

/// Record now (Unix milliseconds) as the last successful connect
pub(crate) fn record_connected(store: &dyn KeyValueStore, namespace: &str) {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    store.set(&last_connected_key(namespace), now_ms.to_string());
}

/// Read back the last successful connect time (Unix milliseconds)
pub fn last_connected_at(store: &dyn KeyValueStore, namespace: &str) -> Option<u64> {
    store.get(&last_connected_key(namespace))?.parse().ok()
}
