//! Client configuration, read from `.trike/trike.toml`.
//!
//! Layered: file → environment → CLI flags. Missing file or sections fall
//! back to defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "https://dispatch.example.com"
//! status_path = "/api/dispatches/active"
//! token = "..."
//! timeout_secs = 10
//!
//! [realtime]
//! socket_url = "wss://dispatch.example.com/socket"
//! channel = "dispatch"
//!
//! [monitor]
//! poll_interval_secs = 5
//! ```
//!
//! Environment overrides: `TRIKE_API_URL`, `TRIKE_API_TOKEN`,
//! `TRIKE_SOCKET_URL`, `TRIKE_POLL_INTERVAL_SECS`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR: &str = ".trike";
pub const CONFIG_FILE: &str = "trike.toml";

/// Dispatch API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    /// Bearer token for the dispatch API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_status_path() -> String {
    "/api/dispatches/active".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            status_path: default_status_path(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Realtime channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSection {
    /// Socket server URL; polling only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_url: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "dispatch".to_string()
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            socket_url: None,
            channel: default_channel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSection {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl MonitorSection {
    /// Poll cadence; never below one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Complete `trike.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrikeConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub realtime: RealtimeSection,
    #[serde(default)]
    pub monitor: MonitorSection,
}

impl TrikeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse trike.toml")
    }

    /// Load `.trike/trike.toml` under `project_dir`, or defaults if absent.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = config_path(project_dir);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize trike.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `TRIKE_*` environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("TRIKE_API_URL") {
            self.api.base_url = url;
        }
        if let Some(token) = non_empty("TRIKE_API_TOKEN") {
            self.api.token = Some(token);
        }
        if let Some(url) = non_empty("TRIKE_SOCKET_URL") {
            self.realtime.socket_url = Some(url);
        }
        if let Some(raw) = non_empty("TRIKE_POLL_INTERVAL_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.monitor.poll_interval_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid TRIKE_POLL_INTERVAL_SECS"),
            }
        }
    }
}

pub fn config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR)
}

pub fn config_path(project_dir: &Path) -> PathBuf {
    config_dir(project_dir).join(CONFIG_FILE)
}
