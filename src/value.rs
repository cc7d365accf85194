//! Single-slot value container with lock-free publish and read.
//!
//! A `ValueCell` holds at most one value behind an `Arc`. Publishing swaps in a
//! freshly allocated `Arc`, so a value handed to a reader is never modified
//! afterwards, even once it has been superseded.

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;

/// Concurrency-safe holder for the latest value of one key.
///
/// Safe for one concurrent writer and any number of concurrent readers.
/// Single-writer discipline is the caller's responsibility.
pub struct ValueCell<T> {
    inner: ArcSwapOption<T>,
}

impl<T> ValueCell<T> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            inner: ArcSwapOption::empty(),
        }
    }

    /// Publishes `value` as the new current value.
    pub fn save(&self, value: T) {
        self.inner.store(Some(Arc::new(value)));
    }

    /// Publishes `value` and hands the previous value back to the writer
    /// if no reader holds it any more.
    ///
    /// Returns `None` when the container was empty or when a reader still
    /// references the old value; in the latter case the old value is freed
    /// once the last reader drops it.
    pub fn save_reclaim(&self, value: T) -> Option<T> {
        let previous = self.inner.swap(Some(Arc::new(value)))?;
        Arc::into_inner(previous)
    }

    /// Returns the most recently published value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.load_full()
    }

    /// Returns true if a value is currently published.
    pub fn is_present(&self) -> bool {
        self.inner.load().is_some()
    }

    /// Empties the container. Readers already holding the value keep it.
    pub fn clear(&self) {
        self.inner.store(None);
    }
}

impl<T> Default for ValueCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("value", &self.inner.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_cell_reports_absent() {
        let cell: ValueCell<u64> = ValueCell::new();
        assert!(cell.get().is_none());
        assert!(!cell.is_present());
    }

    #[test]
    fn test_save_then_get() {
        let cell = ValueCell::new();
        cell.save(String::from("first"));
        cell.save(String::from("second"));
        assert_eq!(cell.get().as_deref().map(String::as_str), Some("second"));
    }

    #[test]
    fn test_clear_keeps_reader_copy_alive() {
        let cell = ValueCell::new();
        cell.save(vec![1u8, 2, 3]);
        let held = cell.get().unwrap();

        cell.clear();

        assert!(cell.get().is_none());
        assert_eq!(*held, vec![1, 2, 3]);
    }

    #[test]
    fn test_superseded_value_is_not_mutated() {
        let cell = ValueCell::new();
        cell.save(vec![7u32; 4]);
        let held = cell.get().unwrap();

        cell.save(vec![9u32; 4]);

        assert_eq!(*held, vec![7; 4]);
        assert_eq!(*cell.get().unwrap(), vec![9; 4]);
    }

    #[test]
    fn test_save_reclaim_returns_unreferenced_value() {
        let cell = ValueCell::new();
        assert!(cell.save_reclaim(vec![1u8]).is_none());

        let reclaimed = cell.save_reclaim(vec![2u8]);
        assert_eq!(reclaimed, Some(vec![1u8]));
    }

    #[test]
    fn test_save_reclaim_skips_value_held_by_reader() {
        let cell = ValueCell::new();
        cell.save(vec![1u8]);
        let held = cell.get().unwrap();

        assert!(cell.save_reclaim(vec![2u8]).is_none());
        assert_eq!(*held, vec![1u8]);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let cell = Arc::new(ValueCell::new());
        cell.save((0u64, 0u64));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        let pair = cell.get().unwrap();
                        assert_eq!(pair.0, pair.1);
                    }
                })
            })
            .collect();

        for i in 1..10_000u64 {
            cell.save((i, i));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
