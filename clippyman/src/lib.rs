//! clippyman - terminal clipboard history with incremental search
//!
//! History lives in a single JSON document holding the entries and a per-character
//! position index. Searching narrows candidates one keystroke at a time against that
//! index instead of rescanning every entry.
//!
//! Layers, bottom up:
//! - `entries` / `index` / `document`: the persisted data model
//! - `store`: keeps entries and index in step and rewrites the document on every change
//! - `search`: incremental query engine
//! - `session`: interactive search state machine, rendered by `tui`
//! - `clipboard` / `config`: backends and runtime settings for the binary

pub(crate) mod candidate;
pub mod clipboard;
pub mod config;
pub mod document;
pub mod entries;
pub mod index;
pub mod interface;
pub mod models;
pub mod search;
pub mod session;
mod store;
pub mod tui;

pub use interface::*;
pub use models::{Entry, EntryId};
pub use store::ClipboardStore;
