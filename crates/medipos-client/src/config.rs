//! # Client Configuration
//!
//! Where the backend lives and what happens to printed receipts.
//!
//! ## Configuration Sources (Priority Order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Loading Order                          │
//! │                                                                         │
//! │  1. Defaults (lowest priority)                                         │
//! │     └── api_url = http://localhost:8001, history_limit = 10            │
//! │                                                                         │
//! │  2. Config File (client.toml)                                          │
//! │     └── Linux:   ~/.config/medipos/client.toml                         │
//! │     └── macOS:   ~/Library/Application Support/com.medipos.medipos/    │
//! │     └── Windows: %APPDATA%\medipos\medipos\config\client.toml          │
//! │                                                                         │
//! │  3. Environment Variables (highest priority)                           │
//! │     └── MEDIPOS_API_URL, MEDIPOS_RECEIPT_DIR,                          │
//! │         MEDIPOS_AUTO_OPEN, MEDIPOS_HISTORY_LIMIT                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example client.toml
//! ```toml
//! api_url = "https://pharmacy.example.com"
//! receipt_dir = "/var/lib/medipos/receipts"
//! auto_open = true
//! history_limit = 10
//! ```
//!
//! Shop settings (currency, tax, receipt text) are not part of this file;
//! they come from the backend's `/api/settings`.

use std::path::PathBuf;

use medipos_core::workflow::session::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

const CONFIG_FILE: &str = "client.toml";

// =============================================================================
// Client Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root; requests go to `{api_url}/api/...`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Directory for rendered receipts. Platform data dir when unset.
    #[serde(default)]
    pub receipt_dir: Option<PathBuf>,

    /// Allows documents to be opened in the system browser for printing.
    /// Receipts additionally need the shop's `auto_print_receipts`.
    #[serde(default = "default_true")]
    pub auto_open: bool,

    /// Previous sales kept for the selected customer.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_api_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            receipt_dir: None,
            auto_open: default_true(),
            history_limit: default_history_limit(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (client.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    pub fn validate(&self) -> ClientResult<()> {
        self.api_base()?;

        if self.history_limit == 0 {
            return Err(ClientError::InvalidConfig(
                "history_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Parsed backend root with a trailing slash, ready for `Url::join`.
    pub fn api_base(&self) -> ClientResult<Url> {
        let mut url = Url::parse(self.api_url.trim())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Where receipts are written.
    pub fn receipt_dir(&self) -> PathBuf {
        self.receipt_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "medipos", "medipos")
                .map(|dirs| dirs.data_dir().join("receipts"))
                .unwrap_or_else(|| std::env::temp_dir().join("medipos-receipts"))
        })
    }

    /// Applies `MEDIPOS_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MEDIPOS_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api_url = url;
        }

        if let Some(dir) = lookup("MEDIPOS_RECEIPT_DIR") {
            debug!(dir = %dir, "Overriding receipt directory from environment");
            self.receipt_dir = Some(PathBuf::from(dir));
        }

        if let Some(flag) = lookup("MEDIPOS_AUTO_OPEN") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.auto_open = true,
                "0" | "false" | "no" | "off" => self.auto_open = false,
                _ => warn!(value = %flag, "Unknown MEDIPOS_AUTO_OPEN value in environment"),
            }
        }

        if let Some(limit) = lookup("MEDIPOS_HISTORY_LIMIT") {
            if let Ok(n) = limit.parse::<usize>() {
                debug!(limit = n, "Overriding history limit from environment");
                self.history_limit = n;
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "medipos", "medipos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}
