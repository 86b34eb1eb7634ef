//! Desired room membership
//!
//! The registry records which rooms the consumer wants, independent of
//! whether a transport currently exists. It is the single source of truth:
//! after every successful (re)connect the manager replays the whole set, so
//! the server-side membership converges back to it and a dropped connection
//! never loses a subscription from the consumer's point of view.
//!
//! The registry never talks to the transport itself. Mutations return the
//! frame the manager should send when connected, and nothing when the call
//! changed nothing.

use roomlink_core::Frame;
use std::collections::HashSet;

/// Set of rooms the consumer wants to be in
#[derive(Debug, Default, Clone)]
pub struct SubscriptionRegistry {
    desired: HashSet<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a room; returns the join frame if the room was not already desired
    pub fn subscribe(&mut self, room: &str) -> Option<Frame> {
        if self.desired.insert(room.to_string()) {
            Some(Frame::subscribe(room))
        } else {
            None
        }
    }

    /// Remove a room; returns the leave frame if the room was desired
    pub fn unsubscribe(&mut self, room: &str) -> Option<Frame> {
        if self.desired.remove(room) {
            Some(Frame::unsubscribe(room))
        } else {
            None
        }
    }

    /// One join frame per desired room, in no particular order
    pub fn replay_all(&self) -> Vec<Frame> {
        self.desired.iter().map(|room| Frame::subscribe(room)).collect()
    }

    pub fn contains(&self, room: &str) -> bool {
        self.desired.contains(room)
    }

    /// Desired rooms, sorted for stable display
    pub fn rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.desired.iter().cloned().collect();
        rooms.sort();
        rooms
    }

    pub fn len(&self) -> usize {
        self.desired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }

    /// Forget every room
    pub fn clear(&mut self) {
        self.desired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();

        let first = registry.subscribe("dns");
        assert_eq!(first, Some(Frame::subscribe("dns")));
        assert!(registry.subscribe("dns").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe("dns");

        assert_eq!(registry.unsubscribe("dns"), Some(Frame::unsubscribe("dns")));
        assert!(registry.unsubscribe("dns").is_none());
        assert!(registry.unsubscribe("never").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replay_covers_every_room_once() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe("dns");
        registry.subscribe("google");
        registry.subscribe("dns");

        let mut rooms: Vec<String> = registry
            .replay_all()
            .iter()
            .map(|frame| {
                assert_eq!(frame.event, "subscribe");
                frame.room().unwrap().to_string()
            })
            .collect();
        rooms.sort();

        assert_eq!(rooms, vec!["dns", "google"]);
    }

    #[test]
    fn test_replay_empty() {
        assert!(SubscriptionRegistry::new().replay_all().is_empty());
    }

    #[test]
    fn test_rooms_sorted_and_clear() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe("meals");
        registry.subscribe("calendar");
        assert_eq!(registry.rooms(), vec!["calendar", "meals"]);
        assert!(registry.contains("meals"));

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains("meals"));
    }
}
