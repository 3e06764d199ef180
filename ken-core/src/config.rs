//! Client configuration.
//!
//! Read from `$XDG_CONFIG_HOME/ken/config.toml` (falling back to
//! `~/.config/ken/config.toml`). Every key is optional. `KEN_API_URL` and
//! `KEN_API_SECRET` in the environment override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_THEME: &str = "ken";
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL, without trailing slash.
    pub api_url: String,
    /// Bearer credential sent with every request except workspace creation.
    pub api_secret: Option<String>,
    /// Built-in theme name.
    pub theme: String,
    /// Delay between the last keystroke and the search request.
    pub search_debounce_ms: u64,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            api_secret: None,
            theme: DEFAULT_THEME.to_owned(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            log_level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Parses a config file. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(toml::from_str(&raw)?)
    }

    /// Loads the config file at [`config_path`] and applies environment
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::from_file(&config_path())?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Applies `KEN_API_URL` / `KEN_API_SECRET` as looked up through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("KEN_API_URL").filter(|v| !v.is_empty()) {
            self.api_url = url;
        }
        if let Some(secret) = lookup("KEN_API_SECRET").filter(|v| !v.is_empty()) {
            self.api_secret = Some(secret);
        }
        self.api_url = self.api_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME").ok().map(|h| {
                fallback
                    .iter()
                    .fold(PathBuf::from(h), |path, part| path.join(part))
            })
        })
        .unwrap_or_else(|| fallback.iter().collect())
}

/// Path of the config file.
pub fn config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", &[".config"])
        .join("ken")
        .join("config.toml")
}

/// Directory for the log file.
pub fn log_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"]).join("ken")
}
