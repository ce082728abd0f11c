//! clippyman public error surface
//!
//! Each layer has its own error enum (`DocumentError`, `ClipboardError`, `ConfigError`);
//! they all convert into `ClippymanError`, which is what the library API returns.

use crate::clipboard::ClipboardError;
use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::models::EntryId;
use thiserror::Error;

/// A highlighted match `[start, end)` in codepoint offsets of an entry's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
}

/// Error type for clippyman operations
#[derive(Debug, Error)]
pub enum ClippymanError {
    /// Lookup or delete of an id that is not in the store.
    /// Recoverable: the UI refuses the action and carries on.
    #[error("entry {0} not found")]
    NotFound(EntryId),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Every id up to `u64::MAX` has been handed out
    #[error("no entry ids left to assign")]
    IdsExhausted,
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl ClippymanError {
    /// Whether the caller may continue after this error.
    /// Everything except `NotFound` ends the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClippymanError::NotFound(_))
    }
}

pub type ClippymanResult<T> = Result<T, ClippymanError>;
