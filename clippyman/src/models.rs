//! Core data models for clippyman
//!
//! An entry id is a decimal string on disk (`"0"`, `"1"`, ...) but is held as an
//! integer in memory so that allocation and ordering never parse strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// ENTRY ID
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of one clipboard history entry.
///
/// Serialized as a decimal string so it can be used as a JSON object key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(u64);

impl EntryId {
    pub const FIRST: EntryId = EntryId(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The id that follows this one. Saturates instead of wrapping.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document key that is not a decimal entry id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid entry id {0:?}: expected decimal digits")]
pub struct InvalidEntryId(pub String);

impl FromStr for EntryId {
    type Err = InvalidEntryId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // u64::from_str would also accept a leading '+'
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidEntryId(s.to_string()));
        }
        s.parse::<u64>()
            .map(EntryId)
            .map_err(|_| InvalidEntryId(s.to_string()))
    }
}

impl TryFrom<String> for EntryId {
    type Error = InvalidEntryId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ENTRY
// ─────────────────────────────────────────────────────────────────────────────

/// One stored clipboard history item. Entries are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: EntryId,
    pub content: String,
}

impl Entry {
    pub fn new(id: EntryId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }
}

/// First line of some content, used for single-row display
pub fn first_line(content: &str) -> &str {
    content.lines().next().unwrap_or("")
}

/// Whether a piece of captured content is worth storing at all.
/// Empty and all-whitespace content is rejected before it reaches the store.
pub fn is_storable(content: &str) -> bool {
    !content.trim().is_empty()
}
