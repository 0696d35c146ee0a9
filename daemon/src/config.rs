//! Daemon configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::DaemonError;

/// Configuration for the vouch coordinator.
///
/// Can be loaded from a TOML file via [`CoordConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). CLI flags and environment
/// variables override file values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordConfig {
    /// Data directory for session storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Port for the HTTP API.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Port for the signaling WebSocket server.
    #[serde(default = "default_signaling_port")]
    pub signaling_port: u16,

    /// Public base URL join links are built from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Join-link lifetime in seconds.
    #[serde(default = "default_link_ttl_secs")]
    pub link_ttl_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./vouch_data")
}

fn default_rpc_port() -> u16 {
    8005
}

fn default_signaling_port() -> u16 {
    8006
}

fn default_public_base_url() -> String {
    "http://localhost:3005".to_string()
}

fn default_link_ttl_secs() -> u64 {
    24 * 3600
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CoordConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &std::path::Path) -> Result<Self, DaemonError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| DaemonError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        toml::from_str(s).map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("CoordConfig is always serializable to TOML")
    }
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rpc_port: default_rpc_port(),
            signaling_port: default_signaling_port(),
            public_base_url: default_public_base_url(),
            link_ttl_secs: default_link_ttl_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
