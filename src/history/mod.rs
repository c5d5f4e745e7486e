//! History store — bounded, head-deduplicated, most-recently-used list.
//!
//! Index 0 is always the most recent entry. The store is owned by the
//! engine loop and mutated only there; see [`crate::engine`].

/// Default number of entries retained.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Result of a [`HistoryStore::capture`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Text was inserted at the head (possibly evicting the oldest entry).
    Inserted,
    /// Text was empty or whitespace-only.
    SuppressedEmpty,
    /// Text equals the current head entry.
    SuppressedDuplicate,
}

impl CaptureOutcome {
    /// Wire/log name of the outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureOutcome::Inserted => "inserted",
            CaptureOutcome::SuppressedEmpty => "suppressed_empty",
            CaptureOutcome::SuppressedDuplicate => "suppressed_duplicate",
        }
    }
}

/// Returned by [`HistoryStore::select`] for a stale or bogus index.
///
/// Callers treat this as a silent no-op: the index was usually computed
/// from a snapshot taken before the history changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("history index {index} out of range (len {len})")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Bounded MRU history of captured text snippets.
#[derive(Debug)]
pub struct HistoryStore {
    /// Entries, most recent first.
    entries: Vec<String>,
    capacity: usize,
}

impl HistoryStore {
    /// Create an empty store holding at most `capacity` entries.
    ///
    /// A zero capacity is clamped to 1; configuration validation rejects
    /// it before we get here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `text` as the most recent entry.
    ///
    /// Suppressed (no mutation at all) when the text is blank or equal to
    /// the current head. Identical entries deeper in the list are left
    /// alone, so the same text may appear more than once.
    pub fn capture(&mut self, text: &str) -> CaptureOutcome {
        if text.trim().is_empty() {
            return CaptureOutcome::SuppressedEmpty;
        }
        if self.entries.first().is_some_and(|head| head == text) {
            return CaptureOutcome::SuppressedDuplicate;
        }

        self.entries.insert(0, text.to_string());
        self.entries.truncate(self.capacity);
        CaptureOutcome::Inserted
    }

    /// Promote the entry at `index` to the head and return its text.
    ///
    /// The relative order of all other entries is preserved and the
    /// length does not change.
    pub fn select(&mut self, index: usize) -> Result<&str, IndexOutOfRange> {
        if index >= self.entries.len() {
            return Err(IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let entry = self.entries.remove(index);
        self.entries.insert(0, entry);
        Ok(&self.entries[0])
    }

    /// Ordered copy of the current entries, most recent first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.clone()
    }

    /// Borrow the entries without copying.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(capacity: usize, texts: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::new(capacity);
        for t in texts {
            store.capture(t);
        }
        store
    }

    // -- Capture --

    #[test]
    fn capture_inserts_at_head() {
        let store = store_with(5, &["hello", "world"]);
        assert_eq!(store.snapshot(), vec!["world", "hello"]);
    }

    #[test]
    fn capture_empty_is_suppressed() {
        let mut store = HistoryStore::new(5);
        assert_eq!(store.capture(""), CaptureOutcome::SuppressedEmpty);
        assert_eq!(store.capture("  \n\t"), CaptureOutcome::SuppressedEmpty);
        assert!(store.is_empty());
    }

    #[test]
    fn capture_same_as_head_is_suppressed() {
        let mut store = HistoryStore::new(5);
        assert_eq!(store.capture("same"), CaptureOutcome::Inserted);
        assert_eq!(store.capture("same"), CaptureOutcome::SuppressedDuplicate);
        assert_eq!(store.snapshot(), vec!["same"]);
    }

    #[test]
    fn capture_matching_non_head_still_inserts() {
        let mut store = store_with(5, &["a", "b"]);
        assert_eq!(store.capture("a"), CaptureOutcome::Inserted);
        assert_eq!(store.snapshot(), vec!["a", "b", "a"]);
    }

    #[test]
    fn capture_whitespace_is_significant_for_dedup() {
        let mut store = store_with(5, &["text"]);
        assert_eq!(store.capture("text "), CaptureOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn capture_evicts_oldest_on_overflow() {
        let store = store_with(2, &["a", "b", "c"]);
        assert_eq!(store.snapshot(), vec!["c", "b"]);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut store = HistoryStore::new(3);
        for i in 0..50 {
            store.capture(&format!("entry {}", i % 7));
            assert!(store.len() <= 3, "len {} after capture {i}", store.len());
        }
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let store = store_with(0, &["a", "b"]);
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.snapshot(), vec!["b"]);
    }

    // -- Select --

    #[test]
    fn select_promotes_to_head() {
        let mut store = store_with(5, &["a", "b", "c", "d"]);
        // [d, c, b, a]
        assert_eq!(store.select(2), Ok("b"));
        assert_eq!(store.snapshot(), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn select_head_is_stable() {
        let mut store = store_with(5, &["a", "b"]);
        assert_eq!(store.select(0), Ok("b"));
        assert_eq!(store.snapshot(), vec!["b", "a"]);
    }

    #[test]
    fn select_last_entry() {
        let mut store = store_with(3, &["a", "b", "c"]);
        assert_eq!(store.select(2), Ok("a"));
        assert_eq!(store.snapshot(), vec!["a", "c", "b"]);
    }

    #[test]
    fn select_out_of_range_is_noop() {
        let mut store = store_with(5, &["a", "b"]);
        let before = store.snapshot();
        assert_eq!(store.select(2), Err(IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(store.select(usize::MAX).map(str::to_owned).ok(), None);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn select_on_empty_store() {
        let mut store = HistoryStore::new(5);
        assert!(store.select(0).is_err());
    }

    // -- End to end --

    #[test]
    fn capture_select_recapture_flow() {
        let mut store = HistoryStore::new(10);
        store.capture("hello");
        store.capture("world");
        assert_eq!(store.snapshot(), vec!["world", "hello"]);

        assert_eq!(store.select(1), Ok("hello"));
        assert_eq!(store.snapshot(), vec!["hello", "world"]);

        assert_eq!(store.capture("hello"), CaptureOutcome::SuppressedDuplicate);
        assert_eq!(store.snapshot(), vec!["hello", "world"]);
    }

    #[test]
    fn outcome_names() {
        assert_eq!(CaptureOutcome::Inserted.as_str(), "inserted");
        assert_eq!(CaptureOutcome::SuppressedEmpty.as_str(), "suppressed_empty");
        assert_eq!(
            CaptureOutcome::SuppressedDuplicate.as_str(),
            "suppressed_duplicate"
        );
    }
}
