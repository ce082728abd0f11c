//! Search candidate with its surviving match starts.
//!
//! Module isolation ensures `starts` can only shrink through `retain_starts`, so a
//! candidate never gains a start that the previous query step had already ruled out.

use crate::interface::HighlightRange;
use crate::models::EntryId;

/// An entry still consistent with the query typed so far.
///
/// `starts` holds every codepoint offset `o` such that the query occurs in the entry's
/// content beginning at `o`. It is never empty for a live candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    pub id: EntryId,
    starts: Vec<usize>,
}

impl SearchCandidate {
    /// Seed a candidate from the offsets of the query's first character
    pub(crate) fn seed(id: EntryId, offsets: &[usize]) -> Option<Self> {
        if offsets.is_empty() {
            return None;
        }
        Some(Self {
            id,
            starts: offsets.to_vec(),
        })
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Keep only starts satisfying `keep`. Returns `None` once no start survives.
    pub(crate) fn retain_starts(mut self, keep: impl FnMut(&usize) -> bool) -> Option<Self> {
        self.starts.retain(keep);
        if self.starts.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Highlight ranges for a query of `query_len` characters
    pub fn highlights(&self, query_len: usize) -> Vec<HighlightRange> {
        self.starts
            .iter()
            .map(|&start| HighlightRange {
                start,
                end: start + query_len,
            })
            .collect()
    }
}
