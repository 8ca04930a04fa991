//! Content-addressed deduplication ledger.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Dedup set of content hashes plus the monotonic save counter.
///
/// Duplicate detection is purely content-hash based: two URLs yielding
/// byte-identical content are one logical image. The set is never evicted;
/// hashes are small fixed-size strings and corpora are bounded by the
/// search API's per-query result cap, so permanent dedup wins over a
/// memory bound.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentLedger {
    seen_hashes: HashSet<String>,
    image_counter: u64,
}

impl ContentLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `hash` has already been accepted.
    #[must_use]
    pub fn is_duplicate(&self, hash: &str) -> bool {
        self.seen_hashes.contains(hash)
    }

    /// Marks `hash` as seen. Idempotent.
    pub fn accept(&mut self, hash: impl Into<String>) {
        self.seen_hashes.insert(hash.into());
    }

    /// Issues the next 1-based sequence number for an accepted save.
    ///
    /// Numbers are strictly increasing and never reused across a session;
    /// duplicates do not consume a number because this is only called after
    /// a hash has been accepted.
    pub fn next_sequence_number(&mut self) -> u64 {
        self.image_counter += 1;
        self.image_counter
    }

    /// Number of distinct hashes seen so far.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen_hashes.len()
    }

    /// Current value of the save counter.
    #[must_use]
    pub fn counter(&self) -> u64 {
        self.image_counter
    }
}
