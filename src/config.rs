use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

use crate::labels::DEFAULT_LABELS;
use crate::store::Backend;

pub const APP_NAME: &str = "simjudge";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editor for list input. Resolved in order: this value → $VISUAL → $EDITOR → vi
    pub editor: Option<String>,
    /// Comma-separated initial labels
    pub labels: String,
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub keybindings: KeybindingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    /// Base URL of the HTTP backend
    pub url: String,
    pub timeout_secs: u64,
    /// Session file of the local backend (default: XDG data dir)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory (or file) the results table is written to
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub next: char,
    pub prev: char,
    pub add_label: char,
    pub refresh: char,
    pub reset: char,
    pub download: char,
    pub edit_labels: char,
    pub help: char,
    pub quit: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: None,
            labels: DEFAULT_LABELS.to_owned(),
            store: StoreConfig::default(),
            export: ExportConfig::default(),
            keybindings: KeybindingsConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            url: "http://localhost:8000".to_owned(),
            timeout_secs: 10,
            path: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Default for KeybindingsConfig {
    fn default() -> Self {
        Self {
            next: 'l',
            prev: 'h',
            add_label: 'a',
            refresh: 'R',
            reset: 'X',
            download: 'd',
            edit_labels: 'e',
            help: '?',
            quit: 'q',
        }
    }
}

impl StoreConfig {
    /// Session file path for the local backend
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_session_path)
    }
}

impl Config {
    /// Load from the given path, or from `~/.config/simjudge/config.toml`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }
}

/// 設定ファイルパス: ~/.config/simjudge/config.toml
pub fn config_path() -> PathBuf {
    BaseDirectories::with_prefix(APP_NAME)
        .map(|dirs| dirs.get_config_home())
        .unwrap_or_else(|_| PathBuf::from(".config").join(APP_NAME))
        .join("config.toml")
}

/// セッションファイル: ~/.local/share/simjudge/session.json
pub fn default_session_path() -> PathBuf {
    BaseDirectories::with_prefix(APP_NAME)
        .map(|dirs| dirs.get_data_home())
        .unwrap_or_else(|_| PathBuf::from(".local/share").join(APP_NAME))
        .join("session.json")
}

/// ログ出力先ディレクトリ: ~/.cache/simjudge/
pub fn cache_dir() -> PathBuf {
    BaseDirectories::with_prefix(APP_NAME)
        .map(|dirs| dirs.get_cache_home())
        .unwrap_or_else(|_| PathBuf::from(".cache").join(APP_NAME))
}
