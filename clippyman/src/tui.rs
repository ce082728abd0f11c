//! Terminal front end for the search session
//!
//! Translates crossterm key events into `session::Key`, feeds them to a `Session`, and
//! redraws with ratatui after every key. Events come from an `EventSource` so the loop
//! can be driven headless in tests.

use crate::interface::{ClippymanResult, HighlightRange};
use crate::models::{first_line, Entry};
use crate::session::{Key, Pane, Session, SessionOutcome, SessionView, VisibleEntry};
use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

const POLL_TIMEOUT: Duration = Duration::from_millis(250);
const SEARCH_PROMPT: &str = "Search: ";
/// Search box plus the list's own borders
const CHROME_ROWS: u16 = 5;

pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>>;
}

pub struct RealEventSource;

impl EventSource for RealEventSource {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

/// Raw mode and alternate screen, undone on drop even if the session errors out
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Run the session until the user selects an entry or quits.
///
/// With `draw` off nothing touches the terminal. `fixed_rows` pins the page size;
/// otherwise it follows the terminal height.
pub fn run(
    session: &mut Session<'_>,
    events: &mut dyn EventSource,
    draw: bool,
    fixed_rows: Option<usize>,
) -> ClippymanResult<Option<Entry>> {
    if let Some(rows) = fixed_rows {
        session.set_page_rows(rows);
    }
    let mut guard = if draw {
        Some(TerminalGuard::enter()?)
    } else {
        None
    };

    loop {
        if let Some(guard) = guard.as_mut() {
            if fixed_rows.is_none() {
                let size = guard.terminal.size()?;
                session.set_page_rows(list_rows(size.height));
            }
            let view = session.view();
            guard.terminal.draw(|frame| render(frame, &view))?;
        }

        let Some(event) = events.poll(POLL_TIMEOUT)? else {
            continue;
        };
        let Event::Key(key_event) = event else {
            continue;
        };
        let Some(key) = map_key(key_event) else {
            continue;
        };
        match session.handle(key)? {
            SessionOutcome::Continue => {}
            SessionOutcome::Selected(entry) => return Ok(Some(entry)),
            SessionOutcome::Quit => return Ok(None),
        }
    }
}

/// Result rows that fit in a terminal `height` rows tall
pub fn list_rows(height: u16) -> usize {
    usize::from(height.saturating_sub(CHROME_ROWS).max(1))
}

pub fn map_key(event: KeyEvent) -> Option<Key> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') => Some(Key::Esc),
            _ => None,
        };
    }
    match event.code {
        KeyCode::Char(ch) => Some(Key::Char(ch)),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Tab | KeyCode::BackTab => Some(Key::Tab),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        _ => None,
    }
}

/// Terminal columns between the prompt start and the query cursor
fn cursor_column(query: &str, cursor: usize) -> u16 {
    let before: String = query.chars().take(cursor).collect();
    let width = Span::raw(SEARCH_PROMPT).width() + Span::raw(before).width();
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn render(frame: &mut Frame, view: &SessionView<'_>) {
    let [search_area, list_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(frame.area());

    let search = Paragraph::new(Line::from(vec![
        Span::raw(SEARCH_PROMPT),
        Span::raw(view.query.clone()),
        Span::styled(
            format!("  ({} results)", view.total),
            Style::new().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::bordered().title(" clippyman "));
    frame.render_widget(search, search_area);

    if view.pane == Pane::SearchInput {
        let offset = cursor_column(&view.query, view.cursor);
        frame.set_cursor_position((
            search_area.x.saturating_add(1).saturating_add(offset),
            search_area.y + 1,
        ));
    }

    let width = usize::from(list_area.width.saturating_sub(2));
    let browsing = view.pane != Pane::SearchInput;
    let lines: Vec<Line> = view
        .visible
        .iter()
        .map(|entry| result_line(entry, width, browsing && entry.selected))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered()),
        list_area,
    );

    if let (Pane::DeleteConfirm, Some(pending)) = (view.pane, view.pending_delete) {
        let area = centered(frame.area(), 30, 5);
        let chosen = Style::new().add_modifier(Modifier::REVERSED);
        let button = |label: &'static str, active: bool| {
            Span::styled(label, if active { chosen } else { Style::new() })
        };
        let dialog = Paragraph::new(vec![
            Line::from(format!("Delete entry #{}?", pending.id)).centered(),
            Line::from(vec![
                button("[ yes ]", pending.confirm),
                Span::raw("  "),
                button("[ no ]", !pending.confirm),
            ])
            .centered(),
        ])
        .block(Block::bordered().title(" Confirm delete "));
        frame.render_widget(Clear, area);
        frame.render_widget(dialog, area);
    }
}

fn result_line(entry: &VisibleEntry<'_>, width: usize, selected: bool) -> Line<'static> {
    let prefix = format!("#{}: ", entry.id);
    let room = width.saturating_sub(prefix.chars().count());
    let highlight = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut spans = vec![Span::raw(prefix)];
    spans.extend(
        highlight_segments(entry.content, &entry.highlights, room)
            .into_iter()
            .map(|(text, hit)| {
                if hit {
                    Span::styled(text, highlight)
                } else {
                    Span::raw(text)
                }
            }),
    );
    let line = Line::from(spans);
    if selected {
        line.style(Style::new().add_modifier(Modifier::REVERSED))
    } else {
        line
    }
}

/// Split the first line of `content` into runs of (text, highlighted), at most `limit`
/// characters. A cut line ends in `…`.
fn highlight_segments(
    content: &str,
    highlights: &[HighlightRange],
    limit: usize,
) -> Vec<(String, bool)> {
    let line = first_line(content);
    let total = line.chars().count();
    let elided = total > limit || line.len() < content.trim_end().len();
    let keep = if elided { limit.saturating_sub(1).min(total) } else { total };

    let mut segments: Vec<(String, bool)> = Vec::new();
    for (offset, ch) in line.chars().take(keep).enumerate() {
        let hit = highlights
            .iter()
            .any(|range| range.start <= offset && offset < range.end);
        match segments.last_mut() {
            Some((text, last_hit)) if *last_hit == hit => text.push(ch),
            _ => segments.push((ch.to_string(), hit)),
        }
    }
    if elided && limit > 0 {
        segments.push(("…".to_string(), false));
    }
    segments
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
