//! Device availability derived from the most recent poll or request.
//!
//! Thread-safe so the poll task and characteristic handlers can share it.
//! Not persisted: every process starts at `Unknown`.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Reachability {
    Unknown,
    Reachable,
    Unreachable,
}

impl Reachability {
    fn encode(self) -> u8 {
        match self {
            Reachability::Unknown => 0,
            Reachability::Reachable => 1,
            Reachability::Unreachable => 2,
        }
    }

    fn decode(value: u8) -> Self {
        match value {
            1 => Reachability::Reachable,
            2 => Reachability::Unreachable,
            _ => Reachability::Unknown,
        }
    }
}

/// Availability flag with a change counter.
///
/// The version is bumped on every transition, so pollers can tell whether
/// anything changed since they last looked.
pub struct Availability {
    state: AtomicU8,
    version: AtomicU32,
    last_seen: RwLock<Option<DateTime<Utc>>>,
}

impl Availability {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(Reachability::Unknown.encode()),
            version: AtomicU32::new(0),
            last_seen: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Reachability {
        Reachability::decode(self.state.load(Ordering::SeqCst))
    }

    pub fn is_reachable(&self) -> bool {
        self.get() == Reachability::Reachable
    }

    /// Record an outcome. Returns true if the state changed.
    pub fn set(&self, value: Reachability) -> bool {
        if value == Reachability::Reachable {
            *self.last_seen.write() = Some(Utc::now());
        }
        let old = self.state.swap(value.encode(), Ordering::SeqCst);
        if old != value.encode() {
            self.version.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    /// Time of the last successful contact with the device.
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        *self.last_seen.read()
    }
}

impl Default for Availability {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let availability = Availability::new();
        assert_eq!(availability.get(), Reachability::Unknown);
        assert!(!availability.is_reachable());
        assert_eq!(availability.version(), 0);
        assert!(availability.last_seen().is_none());
    }

    #[test]
    fn test_transitions_increment_version() {
        let availability = Availability::new();

        assert!(availability.set(Reachability::Reachable));
        assert_eq!(availability.version(), 1);
        assert!(availability.last_seen().is_some());

        // Same value doesn't increment
        assert!(!availability.set(Reachability::Reachable));
        assert_eq!(availability.version(), 1);

        assert!(availability.set(Reachability::Unreachable));
        assert_eq!(availability.get(), Reachability::Unreachable);
        assert_eq!(availability.version(), 2);
    }
}
