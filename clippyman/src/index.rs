//! Character-position inverted index
//!
//! For every distinct character seen across all entries, the index maps entry id to the
//! ascending list of codepoint offsets at which that character occurs in the entry's
//! content. Keys are Unicode scalar values, so a multi-byte character is one key and
//! advances the offset by one.
//!
//! The index grows incrementally on insert and is never rebuilt on that path. `build`
//! exists only for load-time repair of documents whose index disagrees with their entries.

use crate::entries::EntryStore;
use crate::models::EntryId;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Occurrences of one character: entry id → ascending codepoint offsets
pub type Postings = IndexMap<EntryId, Vec<usize>>;

static NO_POSTINGS: Lazy<Postings> = Lazy::new(Postings::new);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionIndex {
    buckets: IndexMap<char, Postings>,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from scratch over every entry in the store
    pub fn build(entries: &EntryStore) -> Self {
        let mut index = Self::new();
        for (id, content) in entries.all() {
            index.index_content(id, content);
        }
        index
    }

    /// Every character that has a bucket, including buckets emptied by deletions
    pub fn char_keys(&self) -> impl Iterator<Item = char> + '_ {
        self.buckets.keys().copied()
    }

    /// Offsets of `ch` in entry `id`, empty if it never occurs there
    pub fn occurrences_of(&self, ch: char, id: EntryId) -> &[usize] {
        self.buckets
            .get(&ch)
            .and_then(|postings| postings.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Entries containing `ch`, with their offsets. Empty if `ch` is unindexed.
    pub fn entries_containing(&self, ch: char) -> &Postings {
        self.buckets.get(&ch).unwrap_or(&NO_POSTINGS)
    }

    /// Whether `ch` occurs at exactly `offset` in entry `id`
    pub fn occurs_at(&self, ch: char, id: EntryId, offset: usize) -> bool {
        self.occurrences_of(ch, id).binary_search(&offset).is_ok()
    }

    /// Append `offset` to the list for `(ch, id)`, creating either level as needed.
    /// Callers scan content left to right, so offsets arrive in increasing order.
    pub fn record_occurrence(&mut self, ch: char, id: EntryId, offset: usize) {
        let offsets = self.buckets.entry(ch).or_default().entry(id).or_default();
        debug_assert!(
            offsets.last().map_or(true, |last| *last < offset),
            "offsets for {ch:?} in entry {id} must be strictly increasing"
        );
        offsets.push(offset);
    }

    /// Record every character of `content` for entry `id`, whitespace and repeats included
    pub fn index_content(&mut self, id: EntryId, content: &str) {
        for (offset, ch) in content.chars().enumerate() {
            self.record_occurrence(ch, id, offset);
        }
    }

    /// Drop entry `id` from every bucket. Emptied buckets stay in place.
    /// Returns how many buckets referenced the entry.
    pub fn remove_entry(&mut self, id: EntryId) -> usize {
        self.buckets
            .values_mut()
            .filter_map(|postings| postings.shift_remove(&id))
            .count()
    }

    pub fn contains_entry(&self, id: EntryId) -> bool {
        self.buckets.values().any(|postings| postings.contains_key(&id))
    }

    /// Number of character buckets (empty ones included)
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Whether this index holds exactly the occurrences of `entries`: every
    /// `(char, id, offset)` present, nothing extra, offsets in ascending order.
    pub fn is_consistent_with(&self, entries: &EntryStore) -> bool {
        self.same_postings(&Self::build(entries))
    }

    fn same_postings(&self, other: &Self) -> bool {
        let non_empty = |index: &Self| {
            index
                .buckets
                .iter()
                .filter(|(_, postings)| postings.values().any(|offsets| !offsets.is_empty()))
                .count()
        };
        if non_empty(self) != non_empty(other) {
            return false;
        }
        other.buckets.iter().all(|(ch, expected)| {
            let actual = self.entries_containing(*ch);
            let actual_len = actual.values().filter(|o| !o.is_empty()).count();
            actual_len == expected.len()
                && expected
                    .iter()
                    .all(|(id, offsets)| actual.get(id) == Some(offsets))
        })
    }
}
