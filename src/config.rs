//! Persisted client configuration.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_VOICE: &str = "Cherry";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            voice: default_voice(),
            enabled: true,
        }
    }
}

impl TtsConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("readaloud").join("config.json"))
    }

    /// Load the saved configuration, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!("ignoring malformed config at {}: {err}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().context("no config directory on this platform")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
