//! Entry store: insertion-ordered id → content map with monotonic id allocation.

use crate::interface::ClippymanError;
use crate::models::{Entry, EntryId};
use indexmap::IndexMap;

/// Ordered mapping from entry id to clipboard text.
///
/// Iteration order is insertion order. Deletion uses `shift_remove` so the order of
/// the remaining entries never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryStore {
    entries: IndexMap<EntryId, String>,
    next_id: EntryId,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted parts.
    /// The allocator resumes at `max(next_id_hint, max(id) + 1)`.
    pub(crate) fn from_parts(entries: IndexMap<EntryId, String>, next_id_hint: u64) -> Self {
        let after_max = entries
            .keys()
            .max()
            .map(|id| id.next())
            .unwrap_or(EntryId::FIRST);
        let next_id = after_max.max(EntryId::new(next_id_hint));
        Self { entries, next_id }
    }

    pub(crate) fn as_map(&self) -> &IndexMap<EntryId, String> {
        &self.entries
    }

    /// The id the next `append` will assign
    pub fn next_id(&self) -> EntryId {
        self.next_id
    }

    /// Store `content` under a freshly allocated id and return that id.
    /// Fails once the id space is used up rather than overwrite a live entry.
    pub fn append(&mut self, content: impl Into<String>) -> Result<EntryId, ClippymanError> {
        let id = self.next_id;
        if self.entries.contains_key(&id) {
            return Err(ClippymanError::IdsExhausted);
        }
        self.entries.insert(id, content.into());
        self.next_id = id.next();
        Ok(id)
    }

    pub fn get(&self, id: EntryId) -> Result<&str, ClippymanError> {
        self.entries
            .get(&id)
            .map(String::as_str)
            .ok_or(ClippymanError::NotFound(id))
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove an entry, returning its content. Ids are never handed out again.
    pub fn delete(&mut self, id: EntryId) -> Result<String, ClippymanError> {
        self.entries
            .shift_remove(&id)
            .ok_or(ClippymanError::NotFound(id))
    }

    /// All entries in insertion order
    pub fn all(&self) -> impl Iterator<Item = (EntryId, &str)> + '_ {
        self.entries.iter().map(|(id, content)| (*id, content.as_str()))
    }

    /// Position of `id` in iteration order
    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.get_index_of(&id)
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.keys().copied().collect()
    }

    pub fn entry(&self, id: EntryId) -> Result<Entry, ClippymanError> {
        self.get(id).map(|content| Entry::new(id, content))
    }

    /// Content of the most recently appended surviving entry
    pub fn last_content(&self) -> Option<&str> {
        self.entries.last().map(|(_, content)| content.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
