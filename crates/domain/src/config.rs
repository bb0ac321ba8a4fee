//! Configuration management

use serde::{Deserialize, Serialize};

use crate::errors::{PlansyncError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub provisioning: ProvisioningConfig,
    pub polling: PollingConfig,
    pub server: ServerConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

/// Remote spreadsheet service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Bearer token for the remote API. Loaded from the environment in
    /// production; never serialized back out.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

/// Workspace provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Portfolio sheet holding one row per project entry.
    pub portfolio_sheet_id: i64,
    /// Container under which per-project workspace folders are created.
    pub parent_folder_id: i64,
    /// Folder whose sheets are cloned into each new workspace.
    pub template_folder_id: i64,
    /// Base URL of the internal application, used for link write-back.
    pub app_base_url: String,
}

/// Polling fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "plansync.db".to_string(), pool_size: 8 }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com/2.0".to_string(),
            access_token: None,
            timeout_seconds: 30,
            max_attempts: 4,
            base_backoff_ms: 250,
            max_backoff_ms: 30_000,
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            portfolio_sheet_id: 0,
            parent_folder_id: 0,
            template_folder_id: 0,
            app_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        // Every 15 minutes; push webhooks make this a safety net, not the
        // primary sync path.
        Self { enabled: true, interval_seconds: 900 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1:8080".to_string() }
    }
}

impl Config {
    /// Parse a TOML document; absent sections fall back to defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| PlansyncError::Config(err.to_string()))
    }
}
