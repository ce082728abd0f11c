//! ClipboardStore - index maintainer over the history document
//!
//! Every mutation follows the same sequence: re-read the document from disk, apply the
//! change to both the entry store and the position index, rewrite the whole document.
//!
//! Persistence failures leave the in-memory document mutated while the file is stale.
//! There is no partial-write recovery, so callers treat them as fatal.

use crate::document::{DocumentFile, HistoryDocument};
use crate::interface::{ClippymanError, ClippymanResult};
use crate::models::{is_storable, EntryId};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Clipboard history backed by a JSON document file
pub struct ClipboardStore {
    document: HistoryDocument,
    file: Option<DocumentFile>,
}

impl ClipboardStore {
    /// Open the document at `path`, creating it if it does not exist
    pub fn open(path: impl Into<PathBuf>) -> ClippymanResult<Self> {
        let file = DocumentFile::new(path);
        file.create_if_missing()?;
        let document = file.read()?;
        debug!(
            path = %file.path().display(),
            entries = document.entries().len(),
            "opened clipboard history"
        );
        Ok(Self {
            document,
            file: Some(file),
        })
    }

    /// A store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            document: HistoryDocument::new(),
            file: None,
        }
    }

    pub fn document(&self) -> &HistoryDocument {
        &self.document
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(DocumentFile::path)
    }

    pub fn get(&self, id: EntryId) -> ClippymanResult<&str> {
        self.document.entries().get(id)
    }

    /// Replace the in-memory document with the one on disk
    pub fn reload(&mut self) -> ClippymanResult<()> {
        if let Some(file) = &self.file {
            self.document = file.read()?;
        }
        Ok(())
    }

    fn persist(&self) -> ClippymanResult<()> {
        if let Some(file) = &self.file {
            file.write(&self.document)?;
        }
        Ok(())
    }

    /// Append `content` as a new entry, index every character, and persist.
    ///
    /// Admission rules (blank, duplicate) are the caller's job; see `save_text`.
    pub fn on_new_entry(&mut self, content: &str) -> ClippymanResult<EntryId> {
        self.reload()?;
        let id = self.document.insert(content)?;
        self.persist()?;
        debug!(%id, chars = content.chars().count(), "added clipboard entry");
        Ok(id)
    }

    /// Remove entry `id` from the position index and the entry store, then persist.
    /// `NotFound` leaves the document untouched.
    pub fn on_delete_entry(&mut self, id: EntryId) -> ClippymanResult<()> {
        self.reload()?;
        self.document.remove(id)?;
        self.persist()?;
        debug!(%id, "deleted clipboard entry");
        Ok(())
    }

    /// Save text unless it is empty or all whitespace.
    /// Returns the new id, or `None` if the text was rejected.
    pub fn save_text(&mut self, text: &str) -> ClippymanResult<Option<EntryId>> {
        if !is_storable(text) {
            return Ok(None);
        }
        self.on_new_entry(text).map(Some)
    }

    /// Delete `id` if present. A missing id is not an error here.
    pub fn delete_if_present(&mut self, id: EntryId) -> ClippymanResult<bool> {
        match self.on_delete_entry(id) {
            Ok(()) => Ok(true),
            Err(ClippymanError::NotFound(_)) => {
                debug!(%id, "delete target already gone");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
