use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Placeholder secrets written into a freshly created config file
const PLACEHOLDER_ACCESS_SECRET: &str = "change-me-access";
const PLACEHOLDER_REFRESH_SECRET: &str = "change-me-refresh";

/// Ten years
const MAX_TOKEN_EXPIRY_MINUTES: i64 = 10 * 365 * 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Upper bound for a single service operation, store calls included.
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_minutes: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    pub accounts_path: String,
    pub attachments_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

fn default_publish_timeout_ms() -> u64 {
    2000
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0:8080".to_string(),
                request_timeout_secs: 2,
                max_upload_bytes: default_max_upload_bytes(),
            },
            auth: AuthConfig {
                access_token_secret: PLACEHOLDER_ACCESS_SECRET.to_string(),
                refresh_token_secret: PLACEHOLDER_REFRESH_SECRET.to_string(),
                access_token_expiry_minutes: 15,
                refresh_token_expiry_minutes: 7 * 24 * 60,
            },
            storage: StorageConfig {
                accounts_path: "./data/accounts".to_string(),
                attachments_path: "./data/attachments".to_string(),
            },
            notifier: NotifierConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read the config at `path`. A missing file is created with defaults; a file that
    /// exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        if !std::path::Path::new(path).exists() {
            info!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                if let Err(e) = std::fs::write(path, s) {
                    warn!("Could not write default config to {}: {}", path, e);
                }
            }
            warn!("Default config carries placeholder token secrets; set real ones before starting");
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!("Config loaded from {}", path);
        Ok(config)
    }

    /// Apply environment overrides on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("SERVER_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = lookup("CONTEXT_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.server.request_timeout_secs = v;
        }
        if let Some(v) = lookup("ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = v;
        }
        if let Some(v) = lookup("REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = v;
        }
        if let Some(v) = lookup("ACCESS_TOKEN_EXPIRY_MINUTES").and_then(|v| v.parse().ok()) {
            self.auth.access_token_expiry_minutes = v;
        }
        if let Some(v) = lookup("REFRESH_TOKEN_EXPIRY_MINUTES").and_then(|v| v.parse().ok()) {
            self.auth.refresh_token_expiry_minutes = v;
        }
        if let Some(v) = lookup("ACCOUNTS_DB_PATH") {
            self.storage.accounts_path = v;
        }
        if let Some(v) = lookup("ATTACHMENTS_DB_PATH") {
            self.storage.attachments_path = v;
        }
        if let Some(v) = lookup("EVENTS_WEBHOOK_URL") {
            self.notifier.webhook_url = Some(v);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let auth = &self.auth;
        if auth.access_token_secret.is_empty() || auth.refresh_token_secret.is_empty() {
            return Err(ConfigError::Invalid("token secrets must not be empty".to_string()));
        }
        if auth.access_token_secret == PLACEHOLDER_ACCESS_SECRET
            || auth.refresh_token_secret == PLACEHOLDER_REFRESH_SECRET
        {
            return Err(ConfigError::Invalid(
                "token secrets are still the placeholders; set ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET"
                    .to_string(),
            ));
        }
        for expiry in [auth.access_token_expiry_minutes, auth.refresh_token_expiry_minutes] {
            if expiry <= 0 || expiry > MAX_TOKEN_EXPIRY_MINUTES {
                return Err(ConfigError::Invalid(format!(
                    "token expiry must be between 1 and {} minutes",
                    MAX_TOKEN_EXPIRY_MINUTES
                )));
            }
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.notifier.publish_timeout_ms)
    }
}
