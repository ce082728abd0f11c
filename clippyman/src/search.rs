//! Incremental query engine
//!
//! Re-derives the candidate set for a growing or shrinking query without rescanning
//! every stored entry on each keystroke. Matching is exact, case-sensitive substring
//! search over codepoints:
//!
//! - Seed (first character): every entry containing the character anywhere, with each
//!   occurrence recorded as a possible match start.
//! - Advance (character `n`, 1-based): each candidate keeps only the starts `s` where the
//!   new character occurs at `s + n - 1`, looked up in the position index. Candidates
//!   with no surviving start are dropped.
//! - Regress (backspace at the end): pop the cached step, no recomputation.
//!
//! The result of every step is cached, so editing in the middle of the query only
//! recomputes the steps at and after the edit position.
//!
//! Results follow entry store order, not relevance.

use crate::candidate::SearchCandidate;
use crate::document::HistoryDocument;
use crate::interface::HighlightRange;
use crate::models::EntryId;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    query: Vec<char>,
    /// `steps[i]` holds the candidates for `query[..=i]`
    steps: Vec<Vec<SearchCandidate>>,
}

impl QueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> String {
        self.query.iter().collect()
    }

    /// Query length in characters
    pub fn len(&self) -> usize {
        self.query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// Candidates for the full query. Empty when the query is empty.
    pub fn candidates(&self) -> &[SearchCandidate] {
        self.steps.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entry ids consistent with the query, in store order.
    /// An empty query yields every entry.
    pub fn results(&self, document: &HistoryDocument) -> Vec<EntryId> {
        match self.steps.last() {
            Some(candidates) => candidates.iter().map(|c| c.id).collect(),
            None => document.entries().ids(),
        }
    }

    /// Highlight ranges of the query inside entry `id`, empty if it is not a candidate
    pub fn highlights(&self, id: EntryId) -> Vec<HighlightRange> {
        self.candidates()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.highlights(self.query.len()))
            .unwrap_or_default()
    }

    /// Append a character to the query (advance)
    pub fn push(&mut self, ch: char, document: &HistoryDocument) {
        self.query.push(ch);
        let step = self.compute_step(self.query.len() - 1, document);
        self.steps.push(step);
    }

    /// Remove the last character and restore the previous step (regress)
    pub fn pop(&mut self) -> Option<char> {
        let ch = self.query.pop()?;
        self.steps.pop();
        Some(ch)
    }

    /// Insert `ch` at character position `pos` (clamped to the query length)
    pub fn insert(&mut self, pos: usize, ch: char, document: &HistoryDocument) {
        let pos = pos.min(self.query.len());
        if pos == self.query.len() {
            self.push(ch, document);
            return;
        }
        self.query.insert(pos, ch);
        self.recompute_from(pos, document);
    }

    /// Remove the character at position `pos`, if any
    pub fn remove(&mut self, pos: usize, document: &HistoryDocument) -> Option<char> {
        if pos >= self.query.len() {
            return None;
        }
        if pos + 1 == self.query.len() {
            return self.pop();
        }
        let ch = self.query.remove(pos);
        self.recompute_from(pos, document);
        Some(ch)
    }

    /// Replace the query wholesale, replaying it one character at a time
    pub fn set_query(&mut self, query: &str, document: &HistoryDocument) {
        self.clear();
        for ch in query.chars() {
            self.push(ch, document);
        }
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.steps.clear();
    }

    fn recompute_from(&mut self, pos: usize, document: &HistoryDocument) {
        self.steps.truncate(pos);
        for i in pos..self.query.len() {
            let step = self.compute_step(i, document);
            self.steps.push(step);
        }
    }

    /// Candidates for `query[..=i]`, given that `steps[..i]` are already computed
    fn compute_step(&self, i: usize, document: &HistoryDocument) -> Vec<SearchCandidate> {
        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();

        let ch = self.query[i];
        let step = if i == 0 {
            seed(ch, document)
        } else {
            advance(&self.steps[i - 1], ch, i, document)
        };

        #[cfg(feature = "perf-log")]
        eprintln!(
            "[perf] step={} char={:?} candidates={} elapsed={:.3}ms",
            i,
            ch,
            step.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        trace!(step = i, char = ?ch, candidates = step.len(), "query step");
        step
    }
}

/// Every entry containing `ch`, in store order, with all occurrences as match starts
fn seed(ch: char, document: &HistoryDocument) -> Vec<SearchCandidate> {
    let entries = document.entries();
    let mut candidates: Vec<(usize, SearchCandidate)> = document
        .index()
        .entries_containing(ch)
        .iter()
        .filter_map(|(id, offsets)| {
            let position = entries.position_of(*id)?;
            SearchCandidate::seed(*id, offsets).map(|c| (position, c))
        })
        .collect();
    // buckets are normally already in store order; this keeps the guarantee for
    // documents whose entries were reordered by hand
    candidates.sort_unstable_by_key(|(position, _)| *position);
    candidates.into_iter().map(|(_, c)| c).collect()
}

/// Keep the starts of `previous` at which `ch` is the character at `delta` past the start
fn advance(
    previous: &[SearchCandidate],
    ch: char,
    delta: usize,
    document: &HistoryDocument,
) -> Vec<SearchCandidate> {
    let index = document.index();
    previous
        .iter()
        .filter_map(|c| {
            c.clone()
                .retain_starts(|start| index.occurs_at(ch, c.id, start + delta))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(contents: &[&str]) -> HistoryDocument {
        let mut doc = HistoryDocument::new();
        for content in contents {
            doc.insert(content).unwrap();
        }
        doc
    }

    fn ids(values: &[u64]) -> Vec<EntryId> {
        values.iter().map(|v| EntryId::new(*v)).collect()
    }

    fn type_query(engine: &mut QueryEngine, query: &str, doc: &HistoryDocument) {
        for ch in query.chars() {
            engine.push(ch, doc);
        }
    }

    #[test]
    fn test_empty_query_returns_all_entries() {
        let doc = doc(&["cat", "car", "dog"]);
        let engine = QueryEngine::new();
        assert_eq!(engine.results(&doc), ids(&[0, 1, 2]));
    }

    #[test]
    fn test_seed_matches_char_anywhere() {
        let doc = doc(&["cat", "arc", "dog"]);
        let mut engine = QueryEngine::new();
        engine.push('c', &doc);
        assert_eq!(engine.results(&doc), ids(&[0, 1]));
    }

    #[test]
    fn test_cat_car_walkthrough() {
        let doc = doc(&["cat", "car"]);
        let mut engine = QueryEngine::new();

        engine.push('c', &doc);
        assert_eq!(engine.results(&doc), ids(&[0, 1]));
        engine.push('a', &doc);
        assert_eq!(engine.results(&doc), ids(&[0, 1]));
        engine.push('t', &doc);
        assert_eq!(engine.results(&doc), ids(&[0]));

        assert_eq!(engine.pop(), Some('t'));
        assert_eq!(engine.query(), "ca");
        assert_eq!(engine.results(&doc), ids(&[0, 1]));
    }

    #[test]
    fn test_substring_match_not_anchored_at_start() {
        let doc = doc(&["concatenate", "scatter", "cart"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "cat", &doc);
        assert_eq!(engine.results(&doc), ids(&[0, 1]));
    }

    #[test]
    fn test_multiple_starts_tracked_independently() {
        // first 'a' is followed by 'b', the second by 'c'
        let doc = doc(&["abxac"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "ac", &doc);
        assert_eq!(engine.results(&doc), ids(&[0]));
        assert_eq!(engine.candidates()[0].starts(), &[3]);
    }

    #[test]
    fn test_no_match_yields_empty_results() {
        let doc = doc(&["cat"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "cz", &doc);
        assert!(engine.results(&doc).is_empty());
        engine.push('q', &doc);
        assert!(engine.results(&doc).is_empty());
    }

    #[test]
    fn test_backspace_all_restores_full_list() {
        let doc = doc(&["alpha", "beta", "gamma"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "amm", &doc);
        assert_eq!(engine.results(&doc), ids(&[2]));
        while engine.pop().is_some() {}
        assert_eq!(engine.results(&doc), ids(&[0, 1, 2]));
        assert_eq!(engine.pop(), None);
    }

    #[test]
    fn test_query_longer_than_content() {
        let doc = doc(&["ab"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "abc", &doc);
        assert!(engine.results(&doc).is_empty());
    }

    #[test]
    fn test_multibyte_and_newlines() {
        let doc = doc(&["naïve\ncafé", "cafe"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "é", &doc);
        assert_eq!(engine.results(&doc), ids(&[0]));
        engine.clear();
        type_query(&mut engine, "e\nc", &doc);
        assert_eq!(engine.results(&doc), ids(&[0]));
    }

    #[test]
    fn test_case_sensitive() {
        let doc = doc(&["Cat", "cat"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "ca", &doc);
        assert_eq!(engine.results(&doc), ids(&[1]));
    }

    #[test]
    fn test_insert_in_middle_recomputes() {
        let doc = doc(&["cart", "cat"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "ct", &doc);
        assert!(engine.results(&doc).is_empty());
        engine.insert(1, 'a', &doc);
        assert_eq!(engine.query(), "cat");
        assert_eq!(engine.results(&doc), ids(&[1]));
    }

    #[test]
    fn test_remove_in_middle_recomputes() {
        let doc = doc(&["cart", "ct"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "cat", &doc);
        assert!(engine.results(&doc).is_empty());
        assert_eq!(engine.remove(1, &doc), Some('a'));
        assert_eq!(engine.query(), "ct");
        assert_eq!(engine.results(&doc), ids(&[1]));
        assert_eq!(engine.remove(5, &doc), None);
    }

    #[test]
    fn test_set_query_matches_typing() {
        let doc = doc(&["hello world", "world hello", "help"]);
        let mut typed = QueryEngine::new();
        type_query(&mut typed, "hel", &doc);
        let mut set = QueryEngine::new();
        set.set_query("hel", &doc);
        assert_eq!(typed.results(&doc), set.results(&doc));
        assert_eq!(set.results(&doc), ids(&[0, 1, 2]));
    }

    #[test]
    fn test_results_follow_store_order_after_delete() {
        let mut doc = doc(&["ab", "xb", "bb"]);
        doc.remove(EntryId::new(1)).unwrap();
        doc.insert("b").unwrap();
        let mut engine = QueryEngine::new();
        engine.push('b', &doc);
        assert_eq!(engine.results(&doc), ids(&[0, 2, 3]));
    }

    #[test]
    fn test_highlights() {
        let doc = doc(&["abcabc"]);
        let mut engine = QueryEngine::new();
        type_query(&mut engine, "bc", &doc);
        assert_eq!(
            engine.highlights(EntryId::FIRST),
            vec![
                HighlightRange { start: 1, end: 3 },
                HighlightRange { start: 4, end: 6 }
            ]
        );
        assert!(engine.highlights(EntryId::new(9)).is_empty());
    }
}
