//! Interactive search session
//!
//! Owns the query cursor, the selection and scroll window over the results, and the
//! delete confirmation sub-flow. Keys come in one at a time; each is handled to
//! completion before the next is read.
//!
//! Panes:
//! - `SearchInput`: editing the query. Printable keys advance the query engine,
//!   backspace regresses it.
//! - `ResultBrowsing`: moving through results (Left/Right act as Up/Down), `d` to
//!   delete, Enter to select.
//! - `DeleteConfirm`: yes/no dialog scoped to one entry.
//!
//! The session reads the store once when it starts. Entries appended by other
//! processes become visible only after a delete (which reloads) or a restart.

use crate::interface::{ClippymanResult, HighlightRange};
use crate::models::{Entry, EntryId};
use crate::search::QueryEngine;
use crate::store::ClipboardStore;
use tracing::debug;

/// Keys the session understands. Front ends translate their own events into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Tab,
    Enter,
    Esc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    SearchInput,
    ResultBrowsing,
    DeleteConfirm,
}

/// Entry awaiting a yes/no answer. `confirm` is the highlighted choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: EntryId,
    pub confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Continue,
    /// The user picked an entry; the session is over
    Selected(Entry),
    /// The user left without picking anything
    Quit,
}

/// One result row in the visible window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleEntry<'a> {
    pub id: EntryId,
    pub content: &'a str,
    pub highlights: Vec<HighlightRange>,
    pub selected: bool,
}

/// Everything a renderer needs to draw the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView<'a> {
    pub query: String,
    pub cursor: usize,
    pub pane: Pane,
    pub total: usize,
    pub selected: usize,
    pub scroll: usize,
    pub visible: Vec<VisibleEntry<'a>>,
    pub pending_delete: Option<PendingDelete>,
}

pub struct Session<'s> {
    store: &'s mut ClipboardStore,
    engine: QueryEngine,
    results: Vec<EntryId>,
    pane: Pane,
    selected: usize,
    scroll: usize,
    /// Cursor position in the query, in characters
    cursor: usize,
    page_rows: usize,
    pending_delete: Option<PendingDelete>,
}

impl<'s> Session<'s> {
    /// Start a session showing every entry. `page_rows` is how many results fit on screen.
    pub fn new(store: &'s mut ClipboardStore, page_rows: usize) -> Self {
        let results = store.document().entries().ids();
        Self {
            store,
            engine: QueryEngine::new(),
            results,
            pane: Pane::SearchInput,
            selected: 0,
            scroll: 0,
            cursor: 0,
            page_rows: page_rows.max(1),
            pending_delete: None,
        }
    }

    pub fn query(&self) -> String {
        self.engine.query()
    }

    pub fn results(&self) -> &[EntryId] {
        &self.results
    }

    pub fn pane(&self) -> Pane {
        self.pane
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pending_delete(&self) -> Option<PendingDelete> {
        self.pending_delete
    }

    pub fn page_rows(&self) -> usize {
        self.page_rows
    }

    /// Resize the visible window, keeping the selection on screen
    pub fn set_page_rows(&mut self, rows: usize) {
        self.page_rows = rows.max(1);
        self.keep_selection_visible();
    }

    pub fn view(&self) -> SessionView<'_> {
        let entries = self.store.document().entries();
        let end = (self.scroll + self.page_rows).min(self.results.len());
        let visible = self
            .results
            .get(self.scroll..end)
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .filter_map(|(offset, id)| {
                let content = entries.get(*id).ok()?;
                Some(VisibleEntry {
                    id: *id,
                    content,
                    highlights: self.engine.highlights(*id),
                    selected: self.scroll + offset == self.selected,
                })
            })
            .collect();
        SessionView {
            query: self.engine.query(),
            cursor: self.cursor,
            pane: self.pane,
            total: self.results.len(),
            selected: self.selected,
            scroll: self.scroll,
            visible,
            pending_delete: self.pending_delete,
        }
    }

    /// Handle one key. Errors are persistence failures from a confirmed delete.
    pub fn handle(&mut self, key: Key) -> ClippymanResult<SessionOutcome> {
        match (self.pane, key) {
            (Pane::DeleteConfirm, key) => self.handle_delete_confirm(key),
            (_, Key::Esc) => Ok(SessionOutcome::Quit),
            (Pane::SearchInput, Key::Tab) => {
                self.pane = Pane::ResultBrowsing;
                Ok(SessionOutcome::Continue)
            }
            (Pane::ResultBrowsing, Key::Tab) => {
                self.pane = Pane::SearchInput;
                Ok(SessionOutcome::Continue)
            }
            (Pane::SearchInput, key) => {
                self.handle_search_input(key);
                Ok(SessionOutcome::Continue)
            }
            (Pane::ResultBrowsing, key) => Ok(self.handle_browsing(key)),
        }
    }

    fn handle_search_input(&mut self, key: Key) {
        match key {
            Key::Char(ch) => {
                self.engine.insert(self.cursor, ch, self.store.document());
                self.cursor += 1;
                self.refresh_results();
            }
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.engine.remove(self.cursor, self.store.document());
                    self.refresh_results();
                }
            }
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.engine.len()),
            Key::Down | Key::Enter => self.pane = Pane::ResultBrowsing,
            _ => {}
        }
    }

    fn handle_browsing(&mut self, key: Key) -> SessionOutcome {
        match key {
            Key::Down | Key::Right => {
                if self.selected + 1 < self.results.len() {
                    self.selected += 1;
                    self.keep_selection_visible();
                }
            }
            Key::Up | Key::Left => {
                if self.selected == 0 {
                    self.pane = Pane::SearchInput;
                } else {
                    self.selected -= 1;
                    self.keep_selection_visible();
                }
            }
            Key::Char('d') => {
                if let Some(id) = self.results.get(self.selected) {
                    self.pending_delete = Some(PendingDelete {
                        id: *id,
                        confirm: false,
                    });
                    self.pane = Pane::DeleteConfirm;
                }
            }
            Key::Enter => {
                if let Some(id) = self.results.get(self.selected) {
                    if let Ok(entry) = self.store.document().entries().entry(*id) {
                        return SessionOutcome::Selected(entry);
                    }
                }
            }
            _ => {}
        }
        SessionOutcome::Continue
    }

    fn handle_delete_confirm(&mut self, key: Key) -> ClippymanResult<SessionOutcome> {
        let Some(pending) = self.pending_delete else {
            self.pane = Pane::ResultBrowsing;
            return Ok(SessionOutcome::Continue);
        };
        match key {
            Key::Left | Key::Right => {
                self.pending_delete = Some(PendingDelete {
                    confirm: !pending.confirm,
                    ..pending
                });
            }
            Key::Enter if pending.confirm => {
                let deleted = self.store.delete_if_present(pending.id)?;
                debug!(id = %pending.id, deleted, "delete confirmed");
                self.reset_after_delete();
            }
            Key::Enter | Key::Char('q') | Key::Esc => self.abort_delete(Pane::ResultBrowsing),
            Key::Tab => self.abort_delete(Pane::SearchInput),
            _ => {}
        }
        Ok(SessionOutcome::Continue)
    }

    fn abort_delete(&mut self, pane: Pane) {
        self.pending_delete = None;
        self.pane = pane;
    }

    /// Full reload after a delete: query cleared, every entry listed, first one selected
    fn reset_after_delete(&mut self) {
        self.pending_delete = None;
        self.engine.clear();
        self.cursor = 0;
        self.results = self.store.document().entries().ids();
        self.selected = 0;
        self.scroll = 0;
        self.pane = Pane::ResultBrowsing;
    }

    fn refresh_results(&mut self) {
        self.results = self.engine.results(self.store.document());
        self.selected = 0;
        self.scroll = 0;
    }

    fn keep_selection_visible(&mut self) {
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + self.page_rows {
            self.scroll = self.selected + 1 - self.page_rows;
        }
    }
}
