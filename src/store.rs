//! Keyed state store holding the latest published sample per metric key.
//!
//! Every key owns one `ValueCell<MetricState<V>>`. A whole `MetricState`
//! (value plus timestamps) is published as one `Arc`, so readers never
//! observe a value paired with another write's timestamp.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::Instant;

use crate::value::ValueCell;

/// One published sample together with the time it was taken.
#[derive(Debug, Clone)]
pub struct MetricState<V> {
    pub value: V,
    /// Monotonic timestamp used for freshness calculations.
    pub last_update: Instant,
    /// Wall-clock timestamp for display.
    pub updated_at: DateTime<Utc>,
}

impl<V> MetricState<V> {
    pub fn new(value: V, last_update: Instant) -> Self {
        Self {
            value,
            last_update,
            updated_at: Utc::now(),
        }
    }
}

/// Shared handle to the slot of a single key.
pub type Slot<V> = Arc<ValueCell<MetricState<V>>>;

/// Keyed collection of value containers.
///
/// Slots are created lazily on first write, or up front via [`StateStore::slot`].
/// Lookups touch one shard of the map; publishing and reading a slot is lock-free.
pub struct StateStore<V> {
    slots: DashMap<String, Slot<V>>,
}

impl<V> StateStore<V> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Returns the slot for `key`, creating an empty one if needed.
    ///
    /// Writers hold on to the returned handle so steady-state publishes
    /// skip the map entirely.
    pub fn slot(&self, key: &str) -> Slot<V> {
        if let Some(slot) = self.slots.get(key) {
            return Arc::clone(slot.value());
        }
        Arc::clone(
            self.slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(ValueCell::new()))
                .value(),
        )
    }

    /// Publishes `value` taken at `at` as the current state of `key`.
    pub fn save_value(&self, key: &str, value: V, at: Instant) {
        self.slot(key).save(MetricState::new(value, at));
    }

    /// Returns the latest published state for `key`.
    pub fn get_state(&self, key: &str) -> Option<Arc<MetricState<V>>> {
        self.slots.get(key).and_then(|slot| slot.value().get())
    }

    /// Empties the slot of `key` without removing the slot itself.
    pub fn clear(&self, key: &str) {
        if let Some(slot) = self.slots.get(key) {
            slot.value().clear();
        }
    }

    /// Number of keys that currently hold a published state.
    pub fn populated(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().is_present())
            .count()
    }
}

impl<V> Default for StateStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_key_has_no_state() {
        let store: StateStore<f64> = StateStore::new();
        assert!(store.get_state("cpu").is_none());
        assert_eq!(store.populated(), 0);
    }

    #[test]
    fn test_save_value_creates_slot() {
        let store = StateStore::new();
        let now = Instant::now();
        store.save_value("cpu", 42.0, now);

        let state = store.get_state("cpu").unwrap();
        assert_eq!(state.value, 42.0);
        assert_eq!(state.last_update, now);
        assert_eq!(store.populated(), 1);
    }

    #[test]
    fn test_slot_handle_shares_storage() {
        let store = StateStore::new();
        let slot = store.slot("memory");
        assert!(store.get_state("memory").is_none());

        slot.save(MetricState::new(7u64, Instant::now()));
        assert_eq!(store.get_state("memory").unwrap().value, 7);
        assert!(Arc::ptr_eq(&slot, &store.slot("memory")));
    }

    #[test]
    fn test_overwrite_replaces_whole_state() {
        let store = StateStore::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(1);

        store.save_value("load", 1u32, t0);
        let before = store.get_state("load").unwrap();
        store.save_value("load", 2u32, t1);
        let after = store.get_state("load").unwrap();

        assert_eq!((before.value, before.last_update), (1, t0));
        assert_eq!((after.value, after.last_update), (2, t1));
    }

    #[test]
    fn test_clear_drops_state_but_keeps_slot() {
        let store = StateStore::new();
        store.save_value("disk", 1u8, Instant::now());
        store.clear("disk");
        assert!(store.get_state("disk").is_none());
        store.clear("unknown");
    }
}
