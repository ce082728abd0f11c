//! clippyman command line
//!
//! With no mode flag it watches the clipboard and records everything copied.
//!
//! Usage:
//!     clippyman                   # watch
//!     echo hi | clippyman -i      # save stdin as an entry
//!     clippyman -s                # search history, copy the pick
//!     clippyman --gen-config      # write a default config file

use anyhow::{Context, Result};
use clap::Parser;
use clippyman::clipboard::{source_for, ClipboardWatcher};
use clippyman::config::{default_config_path, parse_bool, Backend, Config};
use clippyman::session::Session;
use clippyman::tui::{self, RealEventSource};
use clippyman::ClipboardStore;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Initial page size before the terminal reports its height
const DEFAULT_PAGE_ROWS: usize = 10;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clipboard history with incremental search", long_about = None)]
struct Args {
    /// Read text from stdin and save it as one entry
    #[arg(short, long)]
    input: bool,

    /// Copy text from stdin to the clipboard
    #[arg(short, long)]
    copy: bool,

    /// History document to use
    #[arg(short, long, value_name = "PATH")]
    path: Option<PathBuf>,

    /// Use the PRIMARY selection instead of CLIPBOARD
    #[arg(short = 'P', long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", value_parser = parse_flag)]
    primary: Option<bool>,

    /// Don't echo copied or selected content
    #[arg(short = 'S', long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true", value_parser = parse_flag)]
    silent: Option<bool>,

    /// Wayland seat to use
    #[arg(long, value_name = "NAME")]
    wl_seat: Option<String>,

    /// Search the history interactively
    #[arg(short, long, conflicts_with_all = ["input", "copy"])]
    search: bool,

    /// Config file to load
    #[arg(short = 'C', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write a default config file and exit
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    gen_config: Option<Option<PathBuf>>,
}

impl Args {
    fn is_watch(&self) -> bool {
        !(self.input || self.copy || self.search)
    }

    /// Command line values win over the config file
    fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.path {
            config.path = Some(path.clone());
        }
        if let Some(primary) = self.primary {
            config.primary = primary;
        }
        if let Some(silent) = self.silent {
            config.silent = silent;
        }
        if let Some(seat) = &self.wl_seat {
            config.wl_seat = Some(seat.clone());
        }
    }
}

fn parse_flag(value: &str) -> Result<bool, String> {
    Ok(parse_bool(value))
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn read_stdin() -> Result<String> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read stdin")?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("clippyman: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    if let Some(target) = &args.gen_config {
        let path = match target {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        if Config::generate(&path, ask_overwrite)? {
            println!("Generated config at {}", path.display());
        } else {
            println!("Kept existing config at {}", path.display());
        }
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    let watch = args.is_watch();
    init_tracing(if watch && !config.silent { "info" } else { "warn" });
    debug!(?config, "loaded config");

    let history = config.history_path()?;
    let mut store = ClipboardStore::open(&history)?;

    if args.search {
        return search(&mut store, &config);
    }
    if args.input || args.copy {
        let text = read_stdin()?;
        if args.input {
            match store.save_text(&text)? {
                Some(id) => debug!(%id, "saved stdin"),
                None => debug!("stdin was blank, nothing saved"),
            }
        }
        if args.copy {
            source_for(&config).copy_out(&text)?;
            if !config.silent {
                info!("Copied: {}", text);
            }
        }
        return Ok(());
    }

    if let Some(hint) = stdin_hint(config.backend.resolve(), io::stdin().is_terminal()) {
        info!("{hint}");
    }
    let mut watcher = ClipboardWatcher::new(source_for(&config))
        .with_last_seen(store.document().entries().last_content());
    watcher.watch(
        &mut store,
        Duration::from_millis(config.poll_interval_ms),
        || true,
    )?;
    Ok(())
}

/// Shown when the pipe backend would otherwise sit silently on a terminal
fn stdin_hint(backend: Backend, stdin_is_tty: bool) -> Option<&'static str> {
    (backend == Backend::Pipe && stdin_is_tty).then_some(
        "Type or Paste the text to save in the clipboard history, \
         then press enter and CTRL+D to save and exit",
    )
}

fn ask_overwrite(path: &Path) -> bool {
    let mut stderr = io::stderr();
    confirm(path, &mut io::stdin().lock(), &mut stderr).unwrap_or(false)
}

/// Ask on `output` whether `path` may be replaced; anything but y/yes is a no
fn confirm(path: &Path, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{} already exists. Overwrite? [y/N] ", path.display())?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn search(store: &mut ClipboardStore, config: &Config) -> Result<()> {
    let picked = {
        let mut session = Session::new(store, config.page_rows.unwrap_or(DEFAULT_PAGE_ROWS));
        tui::run(&mut session, &mut RealEventSource, true, config.page_rows)?
    };
    let Some(entry) = picked else {
        return Ok(());
    };
    // without a display server there is nowhere to copy to, so just print it
    let headless = config.backend.resolve() == Backend::Pipe;
    if !headless {
        source_for(config).copy_out(&entry.content)?;
    }
    if headless || !config.silent {
        println!("{}", entry.content);
    }
    Ok(())
}
