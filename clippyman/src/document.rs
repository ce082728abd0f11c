//! History document: the entry store and position index persisted together as one
//! JSON object.
//!
//! ```text
//! {
//!   "entries": { "<id>": "<content>", ... },
//!   "index":   { "<char>": { "<id>": [<offset>, ...], ... }, ... },
//!   "next_id": <n>
//! }
//! ```
//!
//! Persistence is whole-document rewrite: every mutation serializes the full document
//! and overwrites the file. That is fine for clipboard-sized histories; larger ones
//! would want batched mutations or an append-only log with compaction.

use crate::entries::EntryStore;
use crate::index::PositionIndex;
use crate::interface::ClippymanError;
use crate::models::EntryId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Contents written when the document file does not exist yet
pub const INITIAL_DOCUMENT: &str = "{\n    \"entries\": {},\n    \"index\": {}\n}\n";

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to access {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {message} at offset {offset}", .path.display())]
    Parse {
        path: PathBuf,
        /// Byte offset of the failure within the file
        offset: usize,
        message: String,
    },
    #[error("failed to serialize history document: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

// ─────────────────────────────────────────────────────────────────────────────
// IN-MEMORY DOCUMENT
// ─────────────────────────────────────────────────────────────────────────────

/// Entry store and position index, kept pairwise consistent.
///
/// `insert` and `remove` are the only mutators, and each touches both structures.
#[derive(Debug, Clone, Default)]
pub struct HistoryDocument {
    entries: EntryStore,
    index: PositionIndex,
}

#[derive(Serialize)]
struct WireRef<'a> {
    entries: &'a IndexMap<EntryId, String>,
    index: &'a PositionIndex,
    #[serde(skip_serializing_if = "is_zero")]
    next_id: u64,
}

#[derive(Deserialize)]
struct Wire {
    entries: IndexMap<EntryId, String>,
    #[serde(default)]
    index: PositionIndex,
    #[serde(default)]
    next_id: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl HistoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &EntryStore {
        &self.entries
    }

    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    /// Append `content` to the store and record every character occurrence
    pub fn insert(&mut self, content: &str) -> Result<EntryId, ClippymanError> {
        let id = self.entries.append(content)?;
        self.index.index_content(id, content);
        Ok(id)
    }

    /// Remove an entry's contributions from the index, then the entry itself.
    /// Fails with `NotFound` without touching anything if `id` is absent.
    pub fn remove(&mut self, id: EntryId) -> Result<String, ClippymanError> {
        if !self.entries.contains(id) {
            return Err(ClippymanError::NotFound(id));
        }
        let buckets = self.index.remove_entry(id);
        debug!(%id, buckets, "removed entry from position index");
        self.entries.delete(id)
    }

    /// Parse a document, rebuilding the index if it disagrees with the entries.
    /// `path` is only used for diagnostics.
    pub fn from_slice(bytes: &[u8], path: &Path) -> DocumentResult<Self> {
        let wire: Wire = serde_json::from_slice(bytes).map_err(|e| DocumentError::Parse {
            path: path.to_path_buf(),
            offset: byte_offset(bytes, e.line(), e.column()),
            message: parse_message(&e),
        })?;

        let mut document = Self {
            entries: EntryStore::from_parts(wire.entries, wire.next_id),
            index: wire.index,
        };
        if !document.index.is_consistent_with(&document.entries) {
            warn!(
                path = %path.display(),
                entries = document.entries.len(),
                "position index does not match entries, rebuilding"
            );
            document.index = PositionIndex::build(&document.entries);
        }
        Ok(document)
    }

    pub fn to_vec_pretty(&self) -> DocumentResult<Vec<u8>> {
        let wire = WireRef {
            entries: self.entries.as_map(),
            index: &self.index,
            next_id: self.entries.next_id().value(),
        };
        let mut bytes = serde_json::to_vec_pretty(&wire)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// serde_json reports 1-based line and byte column; convert to a byte offset
fn byte_offset(bytes: &[u8], line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = bytes
        .split(|b| *b == b'\n')
        .take(line - 1)
        .map(|l| l.len() + 1)
        .sum();
    (line_start + column.saturating_sub(1)).min(bytes.len())
}

/// serde_json's message without its trailing "at line L column C"
fn parse_message(e: &serde_json::Error) -> String {
    let full = e.to_string();
    let suffix = format!(" at line {} column {}", e.line(), e.column());
    full.strip_suffix(&suffix).unwrap_or(&full).to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// FILE
// ─────────────────────────────────────────────────────────────────────────────

/// The on-disk location of a history document
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> DocumentError {
        DocumentError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn ensure_parent(&self) -> DocumentResult<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))
            }
            _ => Ok(()),
        }
    }

    /// Create the file with an empty document if it does not exist.
    /// Returns whether it was created.
    pub fn create_if_missing(&self) -> DocumentResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.ensure_parent()?;
        fs::write(&self.path, INITIAL_DOCUMENT).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "created history document");
        Ok(true)
    }

    /// Read and parse the document. A missing file reads as an empty document;
    /// any other I/O failure is an error.
    pub fn read(&self) -> DocumentResult<HistoryDocument> {
        match fs::read(&self.path) {
            Ok(bytes) => HistoryDocument::from_slice(&bytes, &self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HistoryDocument::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Rewrite the whole file, truncating it to the new length
    pub fn write(&self, document: &HistoryDocument) -> DocumentResult<()> {
        let bytes = document.to_vec_pretty()?;
        self.ensure_parent()?;
        fs::write(&self.path, &bytes).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "rewrote history document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> DocumentResult<HistoryDocument> {
        HistoryDocument::from_slice(json.as_bytes(), Path::new("history.json"))
    }

    #[test]
    fn test_initial_document_parses_empty() {
        let doc = parse(INITIAL_DOCUMENT).unwrap();
        assert!(doc.entries().is_empty());
        assert!(doc.index().is_empty());
        assert_eq!(doc.entries().next_id(), EntryId::FIRST);
    }

    #[test]
    fn test_empty_document_serializes_without_next_id() {
        let json = String::from_utf8(HistoryDocument::new().to_vec_pretty().unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"entries": {}, "index": {}}));
    }

    #[test]
    fn test_insert_and_serialize_layout() {
        let mut doc = HistoryDocument::new();
        doc.insert("ab").unwrap();
        doc.insert("b").unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&doc.to_vec_pretty().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "entries": {"0": "ab", "1": "b"},
                "index": {"a": {"0": [0]}, "b": {"0": [1], "1": [0]}},
                "next_id": 2
            })
        );
    }

    #[test]
    fn test_entries_keep_document_order() {
        let doc = parse(r#"{"entries": {"5": "x", "2": "y", "9": "z"}, "index": {}}"#).unwrap();
        let ids: Vec<u64> = doc.entries().all().map(|(id, _)| id.value()).collect();
        assert_eq!(ids, vec![5, 2, 9]);
        assert_eq!(doc.entries().next_id(), EntryId::new(10));
    }

    #[test]
    fn test_next_id_survives_deleting_highest() {
        let mut doc = HistoryDocument::new();
        doc.insert("a").unwrap();
        let b = doc.insert("b").unwrap();
        doc.remove(b).unwrap();
        let reloaded =
            HistoryDocument::from_slice(&doc.to_vec_pretty().unwrap(), Path::new("h.json"))
                .unwrap();
        assert_eq!(reloaded.entries().next_id(), EntryId::new(2));
    }

    #[test]
    fn test_remove_missing_touches_nothing() {
        let mut doc = HistoryDocument::new();
        doc.insert("cat").unwrap();
        assert!(matches!(
            doc.remove(EntryId::new(4)),
            Err(ClippymanError::NotFound(_))
        ));
        assert_eq!(doc.entries().len(), 1);
        assert_eq!(doc.index().occurrences_of('c', EntryId::FIRST), &[0]);
    }

    #[test]
    fn test_parse_error_reports_byte_offset() {
        let json = "{\n  \"entries\": {\n    \"0\": \"a\",\n  }\n}";
        let err = parse(json).unwrap_err();
        match err {
            DocumentError::Parse { offset, message, .. } => {
                // the failure is reported on line 4, the stray closing brace
                assert_eq!(json[..offset].matches('\n').count(), 3);
                assert!(!message.contains("line"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_display_is_single_line() {
        let err = parse("{\"entries\": [}").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("failed to parse history.json:"));
        assert!(text.contains("at offset"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_invalid_entry_id_is_parse_error() {
        let err = parse(r#"{"entries": {"abc": "x"}, "index": {}}"#).unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));
    }

    #[test]
    fn test_inconsistent_index_is_rebuilt() {
        // byte-offset index for a multi-byte entry, plus a dangling id
        let json = r#"{
            "entries": {"0": "é!"},
            "index": {"!": {"0": [2]}, "x": {"7": [0]}}
        }"#;
        let doc = parse(json).unwrap();
        assert_eq!(doc.index().occurrences_of('!', EntryId::FIRST), &[1]);
        assert_eq!(doc.index().occurrences_of('é', EntryId::FIRST), &[0]);
        assert!(!doc.index().contains_entry(EntryId::new(7)));
    }

    #[test]
    fn test_missing_index_is_rebuilt() {
        let doc = parse(r#"{"entries": {"0": "hi"}}"#).unwrap();
        assert_eq!(doc.index().occurrences_of('i', EntryId::FIRST), &[1]);
    }

    #[test]
    fn test_byte_offset() {
        let bytes = b"ab\ncd\nef";
        assert_eq!(byte_offset(bytes, 1, 1), 0);
        assert_eq!(byte_offset(bytes, 2, 2), 4);
        assert_eq!(byte_offset(bytes, 3, 1), 6);
        assert_eq!(byte_offset(bytes, 0, 0), 0);
        assert_eq!(byte_offset(bytes, 9, 9), bytes.len());
    }

    #[test]
    fn test_file_create_read_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = DocumentFile::new(dir.path().join("nested/dir/history.json"));

        assert!(file.create_if_missing().unwrap());
        assert!(!file.create_if_missing().unwrap());
        assert_eq!(
            std::fs::read_to_string(file.path()).unwrap(),
            INITIAL_DOCUMENT
        );

        let mut doc = file.read().unwrap();
        doc.insert("hello\nworld").unwrap();
        file.write(&doc).unwrap();

        let reloaded = file.read().unwrap();
        assert_eq!(reloaded.entries().get(EntryId::FIRST).unwrap(), "hello\nworld");
        assert_eq!(reloaded.index().occurrences_of('\n', EntryId::FIRST), &[5]);
    }

    #[test]
    fn test_write_truncates_shorter_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = DocumentFile::new(dir.path().join("history.json"));
        let mut doc = HistoryDocument::new();
        let id = doc.insert(&"long content ".repeat(50)).unwrap();
        file.write(&doc).unwrap();
        let long_len = std::fs::metadata(file.path()).unwrap().len();

        doc.remove(id).unwrap();
        file.write(&doc).unwrap();
        let short_len = std::fs::metadata(file.path()).unwrap().len();
        assert!(short_len < long_len);
        assert!(file.read().unwrap().entries().is_empty());
    }

    #[test]
    fn test_read_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = DocumentFile::new(dir.path().join("absent.json"));
        assert!(file.read().unwrap().entries().is_empty());
    }

    #[test]
    fn test_read_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = DocumentFile::new(dir.path());
        assert!(matches!(file.read(), Err(DocumentError::Io { .. })));
    }
}
