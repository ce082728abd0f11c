//! Runtime configuration
//!
//! Read from `<config dir>/clippyman/config.toml` unless a path is given explicitly.
//! Every field is optional; command line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "clippyman";
const CONFIG_FILE: &str = "config.toml";
const HISTORY_FILE: &str = "history.json";
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

const CONFIG_TEMPLATE: &str = r#"# clippyman configuration

# Where the clipboard history document lives.
# path = "~/.local/share/clippyman/history.json"

# Clipboard backend: "auto", "x11", "wayland" or "pipe".
# "auto" picks wayland when WAYLAND_DISPLAY is set, else x11 when DISPLAY is set.
backend = "auto"

# Watch and copy to the PRIMARY selection instead of CLIPBOARD.
primary = false

# Don't echo copied or selected content.
silent = false

# Wayland seat passed to wl-paste/wl-copy.
# wl_seat = "seat0"

# How often watch mode polls the clipboard, in milliseconds.
poll_interval_ms = 50

# Fixed number of result rows in the search screen. Defaults to the terminal height.
# page_rows = 20
"#;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist")]
    Missing(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no {0} directory could be determined for this platform")]
    NoDirectory(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Auto,
    X11,
    Wayland,
    Pipe,
}

impl Backend {
    /// Resolve `Auto` against the session environment
    pub fn resolve(self) -> Backend {
        self.resolve_with(|key| std::env::var_os(key).is_some_and(|v| !v.is_empty()))
    }

    fn resolve_with(self, is_set: impl Fn(&str) -> bool) -> Backend {
        match self {
            Backend::Auto if is_set("WAYLAND_DISPLAY") => Backend::Wayland,
            Backend::Auto if is_set("DISPLAY") => Backend::X11,
            Backend::Auto => Backend::Pipe,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub path: Option<PathBuf>,
    pub backend: Backend,
    pub primary: bool,
    pub silent: bool,
    pub wl_seat: Option<String>,
    pub poll_interval_ms: u64,
    pub page_rows: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            backend: Backend::Auto,
            primary: false,
            silent: false,
            wl_seat: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            page_rows: None,
        }
    }
}

impl Config {
    /// Load from `explicit`, or from the default location.
    /// A missing default file means defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let path = match explicit {
            Some(path) => {
                let path = expand_tilde(path);
                if !path.exists() {
                    return Err(ConfigError::Missing(path));
                }
                path
            }
            None => match default_config_path() {
                Ok(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// History document path, falling back to the platform data directory
    pub fn history_path(&self) -> ConfigResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(expand_tilde(path)),
            None => default_history_path(),
        }
    }

    /// Write the commented default config to `path`, creating parent directories.
    /// An existing file is only replaced when `overwrite` agrees; returns whether it wrote.
    pub fn generate(path: &Path, overwrite: impl FnOnce(&Path) -> bool) -> ConfigResult<bool> {
        if path.exists() && !overwrite(path) {
            return Ok(false);
        }
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        fs::write(path, CONFIG_TEMPLATE).map_err(write_err)?;
        Ok(true)
    }
}

pub fn default_config_path() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoDirectory("config"))
}

pub fn default_history_path() -> ConfigResult<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(HISTORY_FILE))
        .ok_or(ConfigError::NoDirectory("data"))
}

/// Expand a leading `~` to the home directory. Other paths are returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Boolean flag values: `true`, `1` and `enable` are truthy, anything else is false
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "enable"
    )
}
