//! Clipboard backends and the watch loop
//!
//! A `ClipboardSource` is anything that can be polled for the current clipboard text
//! and asked to take new text. The concrete source is picked at startup from the
//! configured backend:
//! - `PipeSource`: one read of stdin, nothing after that
//! - `CommandSource`: shells out to `xclip` (X11) or `wl-paste`/`wl-copy` (Wayland)
//!
//! `ClipboardWatcher` sits between a source and the store and decides what is worth saving.

use crate::config::{Backend, Config};
use crate::interface::ClippymanResult;
use crate::models::{is_storable, EntryId};
use crate::store::ClipboardStore;
use std::io::{self, Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed {
        program: &'static str,
        status: ExitStatus,
    },
    #[error("the {backend} backend cannot {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
    #[error("failed to read clipboard input: {0}")]
    Io(#[from] io::Error),
}

pub type ClipboardResult<T> = Result<T, ClipboardError>;

pub trait ClipboardSource {
    /// Current clipboard text, or `None` when there is nothing to read
    fn poll_once(&mut self) -> ClipboardResult<Option<String>>;

    /// Put `content` on the clipboard
    fn copy_out(&mut self, content: &str) -> ClipboardResult<()>;

    fn name(&self) -> &'static str;

    /// True once the source can never produce anything again
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl<S: ClipboardSource + ?Sized> ClipboardSource for Box<S> {
    fn poll_once(&mut self) -> ClipboardResult<Option<String>> {
        (**self).poll_once()
    }

    fn copy_out(&mut self, content: &str) -> ClipboardResult<()> {
        (**self).copy_out(content)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

/// Reads its input to the end exactly once
pub struct PipeSource<R> {
    reader: Option<R>,
}

impl<R: Read> PipeSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<R: Read> ClipboardSource for PipeSource<R> {
    fn poll_once(&mut self) -> ClipboardResult<Option<String>> {
        let Some(mut reader) = self.reader.take() else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn copy_out(&mut self, _content: &str) -> ClipboardResult<()> {
        Err(ClipboardError::Unsupported {
            backend: self.name(),
            operation: "copy to the clipboard",
        })
    }

    fn name(&self) -> &'static str {
        "pipe"
    }

    fn is_exhausted(&self) -> bool {
        self.reader.is_none()
    }
}

/// A program invocation: binary plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    program: &'static str,
    args: Vec<String>,
}

impl Invocation {
    fn command(&self) -> Command {
        let mut command = Command::new(self.program);
        command.args(&self.args);
        command
    }
}

/// Talks to the display server through the standard command line tools
#[derive(Debug, Clone)]
pub struct CommandSource {
    name: &'static str,
    paste: Invocation,
    copy: Invocation,
}

impl CommandSource {
    pub fn x11(primary: bool) -> Self {
        let selection = if primary { "primary" } else { "clipboard" };
        let with = |mode: &str| Invocation {
            program: "xclip",
            args: vec!["-selection".into(), selection.into(), mode.into()],
        };
        Self {
            name: "x11",
            paste: with("-o"),
            copy: with("-i"),
        }
    }

    pub fn wayland(primary: bool, seat: Option<&str>) -> Self {
        let mut common = Vec::new();
        if primary {
            common.push("--primary".to_string());
        }
        if let Some(seat) = seat {
            common.push("--seat".to_string());
            common.push(seat.to_string());
        }
        let mut paste_args = vec!["--no-newline".to_string()];
        paste_args.extend(common.iter().cloned());
        Self {
            name: "wayland",
            paste: Invocation {
                program: "wl-paste",
                args: paste_args,
            },
            copy: Invocation {
                program: "wl-copy",
                args: common,
            },
        }
    }
}

impl ClipboardSource for CommandSource {
    fn poll_once(&mut self) -> ClipboardResult<Option<String>> {
        let output = self
            .paste
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ClipboardError::Spawn {
                program: self.paste.program,
                source,
            })?;
        // both tools exit non-zero when the selection is empty
        if !output.status.success() {
            debug!(
                program = self.paste.program,
                status = %output.status,
                "nothing to paste"
            );
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn copy_out(&mut self, content: &str) -> ClipboardResult<()> {
        let program = self.copy.program;
        // xclip and wl-copy fork a child that keeps serving the selection; it must not
        // hold any pipe we wait on
        let mut child = self
            .copy
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ClipboardError::Spawn { program, source })?;
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(content.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;
        if !status.success() {
            return Err(ClipboardError::Failed { program, status });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Build the source for the configured backend. `Auto` is resolved from the environment.
pub fn source_for(config: &Config) -> Box<dyn ClipboardSource> {
    match config.backend.resolve() {
        Backend::Wayland => Box::new(CommandSource::wayland(
            config.primary,
            config.wl_seat.as_deref(),
        )),
        Backend::X11 => Box::new(CommandSource::x11(config.primary)),
        Backend::Pipe | Backend::Auto => Box::new(PipeSource::new(io::stdin())),
    }
}

/// Applies the admission rules to whatever a source produces
pub struct ClipboardWatcher<S> {
    source: S,
    last_seen: Option<String>,
}

impl<S: ClipboardSource> ClipboardWatcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_seen: None,
        }
    }

    /// Treat `content` as already seen, so it is not saved again on the first poll
    pub fn with_last_seen(mut self, content: Option<&str>) -> Self {
        self.last_seen = content.map(str::to_string);
        self
    }

    /// Strip NUL bytes, then reject repeats of the last saved text and blank text
    pub fn admit(&mut self, raw: String) -> Option<String> {
        let content = if raw.contains('\0') {
            raw.replace('\0', "")
        } else {
            raw
        };
        if self.last_seen.as_deref() == Some(content.as_str()) || !is_storable(&content) {
            return None;
        }
        self.last_seen = Some(content.clone());
        Some(content)
    }

    /// Poll the source once and save anything admitted
    pub fn poll_into(&mut self, store: &mut ClipboardStore) -> ClippymanResult<Option<EntryId>> {
        let Some(raw) = self.source.poll_once()? else {
            return Ok(None);
        };
        let Some(content) = self.admit(raw) else {
            return Ok(None);
        };
        let id = store.on_new_entry(&content)?;
        info!(%id, "Copied: {}", content);
        Ok(Some(id))
    }

    /// Poll every `interval` until the source is exhausted or `keep_going` says stop
    pub fn watch(
        &mut self,
        store: &mut ClipboardStore,
        interval: Duration,
        mut keep_going: impl FnMut() -> bool,
    ) -> ClippymanResult<()> {
        debug!(backend = self.source.name(), ?interval, "watching clipboard");
        while keep_going() {
            self.poll_into(store)?;
            if self.source.is_exhausted() {
                break;
            }
            thread::sleep(interval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of clipboard states
    struct ScriptedSource {
        polls: VecDeque<Option<String>>,
        copied: Vec<String>,
    }

    impl ScriptedSource {
        fn new(polls: &[Option<&str>]) -> Self {
            Self {
                polls: polls.iter().map(|p| p.map(str::to_string)).collect(),
                copied: Vec::new(),
            }
        }
    }

    impl ClipboardSource for ScriptedSource {
        fn poll_once(&mut self) -> ClipboardResult<Option<String>> {
            Ok(self.polls.pop_front().flatten())
        }

        fn copy_out(&mut self, content: &str) -> ClipboardResult<()> {
            self.copied.push(content.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn is_exhausted(&self) -> bool {
            self.polls.is_empty()
        }
    }

    #[test]
    fn test_admit_rules() {
        let mut watcher = ClipboardWatcher::new(ScriptedSource::new(&[]));
        assert_eq!(watcher.admit("a\0b".into()), Some("ab".into()));
        assert_eq!(watcher.admit("ab".into()), None);
        assert_eq!(watcher.admit("  \n".into()), None);
        assert_eq!(watcher.admit(String::new()), None);
        assert_eq!(watcher.admit("c".into()), Some("c".into()));
        assert_eq!(watcher.admit("ab".into()), Some("ab".into()));
    }

    #[test]
    fn test_watch_saves_distinct_content() {
        let source = ScriptedSource::new(&[
            Some("one"),
            Some("one"),
            None,
            Some("   "),
            Some("two"),
            Some("one"),
        ]);
        let mut watcher = ClipboardWatcher::new(source);
        let mut store = ClipboardStore::in_memory();
        watcher
            .watch(&mut store, Duration::ZERO, || true)
            .unwrap();
        let contents: Vec<&str> = store.document().entries().all().map(|(_, c)| c).collect();
        assert_eq!(contents, vec!["one", "two", "one"]);
    }

    #[test]
    fn test_last_seen_seed_skips_current_clipboard() {
        let source = ScriptedSource::new(&[Some("old"), Some("new")]);
        let mut watcher = ClipboardWatcher::new(source).with_last_seen(Some("old"));
        let mut store = ClipboardStore::in_memory();
        assert_eq!(watcher.poll_into(&mut store).unwrap(), None);
        assert_eq!(watcher.poll_into(&mut store).unwrap(), Some(EntryId::FIRST));
    }

    #[test]
    fn test_watch_stops_when_asked() {
        let source = ScriptedSource::new(&[Some("a"), Some("b"), Some("c")]);
        let mut watcher = ClipboardWatcher::new(source);
        let mut store = ClipboardStore::in_memory();
        let mut rounds = 0;
        watcher
            .watch(&mut store, Duration::ZERO, || {
                rounds += 1;
                rounds <= 2
            })
            .unwrap();
        assert_eq!(store.document().entries().len(), 2);
    }

    #[test]
    fn test_pipe_source_reads_once() {
        let mut source = PipeSource::new("piped text\n".as_bytes());
        assert!(!source.is_exhausted());
        assert_eq!(source.poll_once().unwrap().as_deref(), Some("piped text\n"));
        assert!(source.is_exhausted());
        assert_eq!(source.poll_once().unwrap(), None);
        assert!(matches!(
            source.copy_out("x"),
            Err(ClipboardError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_pipe_source_invalid_utf8_is_lossy() {
        let mut source = PipeSource::new(&[b'a', 0xff, b'b'][..]);
        assert_eq!(source.poll_once().unwrap().as_deref(), Some("a\u{fffd}b"));
    }

    #[test]
    fn test_pipe_into_store() {
        let mut watcher = ClipboardWatcher::new(PipeSource::new("hello".as_bytes()));
        let mut store = ClipboardStore::in_memory();
        watcher
            .watch(&mut store, Duration::from_secs(60), || true)
            .unwrap();
        assert_eq!(store.get(EntryId::FIRST).unwrap(), "hello");
    }

    #[test]
    fn test_command_invocations() {
        let x11 = CommandSource::x11(true);
        assert_eq!(x11.paste.program, "xclip");
        assert_eq!(x11.paste.args, vec!["-selection", "primary", "-o"]);
        assert_eq!(x11.copy.args, vec!["-selection", "primary", "-i"]);

        let wayland = CommandSource::wayland(false, Some("seat1"));
        assert_eq!(wayland.paste.program, "wl-paste");
        assert_eq!(wayland.paste.args, vec!["--no-newline", "--seat", "seat1"]);
        assert_eq!(wayland.copy.program, "wl-copy");
        assert_eq!(wayland.copy.args, vec!["--seat", "seat1"]);
        assert_eq!(wayland.name(), "wayland");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut source = CommandSource {
            name: "test",
            paste: Invocation {
                program: "clippyman-no-such-program",
                args: Vec::new(),
            },
            copy: Invocation {
                program: "clippyman-no-such-program",
                args: Vec::new(),
            },
        };
        assert!(matches!(
            source.poll_once(),
            Err(ClipboardError::Spawn { .. })
        ));
        assert!(matches!(
            source.copy_out("x"),
            Err(ClipboardError::Spawn { .. })
        ));
    }

    fn shell_copier(script: &str) -> CommandSource {
        let sh = Invocation {
            program: "sh",
            args: vec!["-c".to_string(), script.to_string()],
        };
        CommandSource {
            name: "test",
            paste: sh.clone(),
            copy: sh,
        }
    }

    #[test]
    fn test_copy_out_does_not_wait_for_forked_server() {
        // like xclip -i: read the selection, leave a background child behind, exit
        let mut source = shell_copier("cat >/dev/null; sleep 4 &");
        let started = std::time::Instant::now();
        source.copy_out("picked").unwrap();
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "copy_out took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn test_copy_out_reports_failure_status() {
        let mut source = shell_copier("cat >/dev/null; exit 3");
        assert!(matches!(
            source.copy_out("x"),
            Err(ClipboardError::Failed { program: "sh", .. })
        ));
    }

    #[test]
    fn test_scripted_copy_out() {
        let mut source = ScriptedSource::new(&[]);
        source.copy_out("picked").unwrap();
        assert_eq!(source.copied, vec!["picked"]);
    }
}
