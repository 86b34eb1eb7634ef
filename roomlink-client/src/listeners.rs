//! Application event listeners
//!
//! Listeners are registered per event name and survive reconnects: the
//! table belongs to the manager, not to any transport, and every inbound
//! frame from whichever transport is current is dispatched through it.
//! Consumers therefore never re-register after a reconnect.
//!
//! # Closed Event Set
//!
//! When the manager is configured with a set of known event names, the
//! table rejects registrations outside that set with `Error::UnknownEvent`,
//! catching typos like `"dns-stauts"` at registration time instead of
//! silently never firing. With no known set configured any name is
//! accepted. Reserved protocol names (`ping`, `pong`, `subscribe`,
//! `unsubscribe`) are always rejected.
//!
//! # Removal
//!
//! `off` removes a listener by identity: pass the same `Listener` (or a
//! clone of the `Arc`) that was given to `on`.
//!
//! # Examples
//!
//! ```rust
//! use roomlink_client::{listener, ListenerTable};
//! use roomlink_core::Frame;
//!
//! let mut table = ListenerTable::new(["dns-status"]);
//! let on_status = listener(|frame: &Frame| println!("status: {}", frame.data));
//!
//! table.on("dns-status", on_status.clone()).unwrap();
//! assert!(table.on("dns-stauts", on_status.clone()).is_err());
//!
//! assert!(table.off("dns-status", &on_status));
//! ```

use roomlink_core::{is_reserved, Error, Frame, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Callback invoked for every frame of the event it was registered for
pub type Listener = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Wrap a closure as a `Listener`
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Frame) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Event name to listeners mapping
#[derive(Default)]
pub struct ListenerTable {
    known: HashSet<String>,
    listeners: HashMap<String, Vec<Listener>>,
}

impl ListenerTable {
    /// Create a table accepting only `known` event names (any name if empty)
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            listeners: HashMap::new(),
        }
    }

    /// Check that `event` may carry application listeners
    pub fn validate(&self, event: &str) -> Result<()> {
        if is_reserved(event) {
            return Err(Error::ReservedEvent(event.to_string()));
        }
        if !self.known.is_empty() && !self.known.contains(event) {
            return Err(Error::UnknownEvent(event.to_string()));
        }
        Ok(())
    }

    /// Register a listener; registering the same listener twice is a no-op
    pub fn on(&mut self, event: &str, listener: Listener) -> Result<()> {
        self.validate(event)?;
        let entry = self.listeners.entry(event.to_string()).or_default();
        if !entry.iter().any(|existing| same_listener(existing, &listener)) {
            entry.push(listener);
        }
        Ok(())
    }

    /// Remove a listener by identity; returns whether it was registered
    pub fn off(&mut self, event: &str, listener: &Listener) -> bool {
        let Some(entry) = self.listeners.get_mut(event) else {
            return false;
        };

        let before = entry.len();
        entry.retain(|existing| !same_listener(existing, listener));
        let removed = entry.len() != before;

        if entry.is_empty() {
            self.listeners.remove(event);
        }
        removed
    }

    /// Invoke every listener registered for the frame's event
    ///
    /// Returns the number of listeners called.
    pub fn dispatch(&self, frame: &Frame) -> usize {
        match self.listeners.get(&frame.event) {
            Some(entry) => {
                for listener in entry {
                    listener(frame);
                }
                entry.len()
            }
            None => {
                tracing::trace!(event = %frame.event, "No listener for event");
                0
            }
        }
    }

    /// Number of listeners registered for `event`
    pub fn count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }

    /// Event names with at least one listener
    pub fn events(&self) -> Vec<String> {
        self.listeners.keys().cloned().collect()
    }

    /// Total listeners across all events
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Drop every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerTable")
            .field("known", &self.known)
            .field("listeners", &self.len())
            .finish()
    }
}
