//! Shared configuration and persistence for the camwall binaries.
//!
//! TOML config file (+ `CAMWALL_`-prefixed env overrides) for defaults,
//! and [`FileStore`] — the JSON key-value persistence collaborator the
//! core writes the camera list and bus settings through. Bus settings
//! saved at runtime take priority over the config file, so the wall
//! reconnects to the broker it last used.

mod file_store;

use std::path::PathBuf;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use camwall_core::store::{BUS_NAMESPACE, Persistence};
use camwall_net::BusConfig;

pub use file_store::FileStore;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub bus: BusSettings,

    #[serde(default)]
    pub feed: FeedSettings,
}

/// Broker defaults, overridable by settings persisted at runtime.
#[derive(Debug, Deserialize, Serialize)]
pub struct BusSettings {
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            topic: default_topic(),
            client_id: default_client_id(),
        }
    }
}

fn default_broker_url() -> String {
    "ws://127.0.0.1:8883".into()
}
fn default_topic() -> String {
    "camera/ip".into()
}
fn default_client_id() -> String {
    "camwall".into()
}

impl BusSettings {
    /// Translate to the transport crate's [`BusConfig`].
    pub fn to_bus_config(&self) -> Result<BusConfig, ConfigError> {
        let broker_url = self
            .broker_url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "bus.broker_url".into(),
                reason: format!("invalid URL: {}", self.broker_url),
            })?;
        Ok(BusConfig {
            broker_url,
            topic: self.topic.clone(),
            client_id: self.client_id.clone(),
        })
    }
}

/// Feed polling defaults.
#[derive(Debug, Deserialize, Serialize)]
pub struct FeedSettings {
    /// Delay between feed fetches, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    200
}

// ── Paths ───────────────────────────────────────────────────────────

/// Config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "camwall", "camwall").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Data directory for the JSON persistence namespaces.
pub fn data_path() -> PathBuf {
    ProjectDirs::from("com", "camwall", "camwall")
        .map_or_else(dirs_fallback, |dirs| dirs.data_dir().to_path_buf())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".camwall");
    p
}

// ── Config loading / saving ─────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("CAMWALL_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Runtime bus settings (persistence collaborator) ─────────────────

/// Bus settings saved at runtime, if any.
///
/// A malformed document is treated as absent — the wall falls back to
/// the config file rather than refusing to start.
pub fn persisted_bus_config(persistence: &dyn Persistence) -> Option<BusConfig> {
    let value = persistence.load(BUS_NAMESPACE).ok().flatten()?;
    match serde_json::from_value(value) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(error = %e, "persisted bus settings are malformed, ignoring");
            None
        }
    }
}

/// Save bus settings for the next start.
pub fn save_bus_config(
    persistence: &dyn Persistence,
    config: &BusConfig,
) -> Result<(), ConfigError> {
    let value = serde_json::to_value(config).map_err(|e| ConfigError::Validation {
        field: "bus".into(),
        reason: e.to_string(),
    })?;
    persistence
        .store(BUS_NAMESPACE, &value)
        .map_err(|e| ConfigError::Validation {
            field: "bus".into(),
            reason: e.to_string(),
        })
}

// ── Tests ───────────────────────────────────────────────────────────
