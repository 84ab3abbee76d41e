//! Application configuration.
//!
//! Configuration is stored in `.tether/config.yaml` and includes:
//! - Zendesk instance URL and API credentials
//! - The custom field that holds linked tickets
//! - Retry policy for target-record reads during a link transaction
//!
//! Every Zendesk value and the field id can be overridden from the environment,
//! which takes precedence over the file.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TetherError};
use crate::link::RecordId;
use crate::sync::ReadPolicy;

pub const ENV_ROOT: &str = "TETHER_ROOT";
pub const ENV_BASE_URL: &str = "ZENDESK_BASE_URL";
pub const ENV_EMAIL: &str = "ZENDESK_EMAIL";
pub const ENV_API_TOKEN: &str = "ZENDESK_API_TOKEN";
pub const ENV_LINKED_FIELD_ID: &str = "TETHER_LINKED_FIELD_ID";

/// Keys accepted by `config get` / `config set`
pub const VALID_KEYS: &[&str] = &[
    "zendesk.base_url",
    "zendesk.email",
    "zendesk.api_token",
    "linked_field.id",
    "sync.read_retries",
    "sync.retry_backoff_ms",
];

/// Returns the directory holding tether's local state.
pub fn tether_root() -> PathBuf {
    if let Ok(root) = env::var(ENV_ROOT) {
        PathBuf::from(root)
    } else {
        PathBuf::from(".tether")
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub zendesk: ZendeskConfig,

    #[serde(default)]
    pub linked_field: LinkedFieldConfig,

    #[serde(default, skip_serializing_if = "SyncConfig::is_default")]
    pub sync: SyncConfig,
}

/// Zendesk instance and credentials
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ZendeskConfig {
    /// Instance root, e.g. `https://acme.zendesk.com`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Agent email used for API token authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl fmt::Debug for ZendeskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZendeskConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// The custom field holding the comma-separated `link:<id>` list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkedFieldConfig {
    /// Field id as shown in the Zendesk admin center
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Link transaction tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Extra attempts for a transient failure reading the target record
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Delay before each extra attempt, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_read_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            read_retries: default_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl SyncConfig {
    pub fn is_default(&self) -> bool {
        *self == SyncConfig::default()
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        tether_root().join("config.yaml")
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            TetherError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TetherError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).map_err(|e| {
            TetherError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // The file holds an API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, permissions)?;
        }

        Ok(())
    }

    /// Zendesk instance root without a trailing slash
    pub fn base_url(&self) -> Option<String> {
        env_non_empty(ENV_BASE_URL)
            .or_else(|| self.zendesk.base_url.clone())
            .map(|url| url.trim().trim_end_matches('/').to_string())
    }

    pub fn email(&self) -> Option<String> {
        env_non_empty(ENV_EMAIL).or_else(|| self.zendesk.email.clone())
    }

    pub fn api_token(&self) -> Option<String> {
        env_non_empty(ENV_API_TOKEN).or_else(|| self.zendesk.api_token.clone())
    }

    /// Raw linked field id, before integer parsing
    pub fn linked_field_raw(&self) -> Option<String> {
        env_non_empty(ENV_LINKED_FIELD_ID).or_else(|| self.linked_field.id.clone())
    }

    /// The linked-tickets custom field id
    pub fn linked_field_id(&self) -> Result<u64> {
        let raw = self.linked_field_raw().ok_or_else(|| {
            TetherError::Config(format!(
                "linked field id not configured. Set {ENV_LINKED_FIELD_ID} or run: tether config set linked_field.id <id>"
            ))
        })?;
        parse_field_id(&raw)
    }

    /// Agent-facing URL of a ticket, for display only
    pub fn ticket_url(&self, id: RecordId) -> Option<String> {
        self.base_url()
            .map(|base| format!("{base}/agent/tickets/{id}"))
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            retries: self.sync.read_retries,
            backoff: Duration::from_millis(self.sync.retry_backoff_ms),
        }
    }

    /// Set a value by dotted key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "zendesk.base_url" => {
                url::Url::parse(value).map_err(|e| {
                    TetherError::Config(format!("invalid base URL '{value}': {e}"))
                })?;
                self.zendesk.base_url = Some(value.trim_end_matches('/').to_string());
            }
            "zendesk.email" => self.zendesk.email = Some(value.to_string()),
            "zendesk.api_token" => self.zendesk.api_token = Some(value.to_string()),
            "linked_field.id" => {
                parse_field_id(value)?;
                self.linked_field.id = Some(value.trim().to_string());
            }
            "sync.read_retries" => {
                self.sync.read_retries = value.parse().map_err(|_| {
                    TetherError::Config(format!(
                        "invalid value '{value}' for sync.read_retries. Expected a non-negative integer"
                    ))
                })?;
            }
            "sync.retry_backoff_ms" => {
                self.sync.retry_backoff_ms = value.parse().map_err(|_| {
                    TetherError::Config(format!(
                        "invalid value '{value}' for sync.retry_backoff_ms. Expected milliseconds"
                    ))
                })?;
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Effective value by dotted key, with environment overrides applied
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "zendesk.base_url" => self.base_url(),
            "zendesk.email" => self.email(),
            "zendesk.api_token" => self.api_token(),
            "linked_field.id" => self.linked_field_raw(),
            "sync.read_retries" => Some(self.sync.read_retries.to_string()),
            "sync.retry_backoff_ms" => Some(self.sync.retry_backoff_ms.to_string()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }
}

fn parse_field_id(raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        TetherError::Config(format!(
            "linked field id '{raw}' is not an integer"
        ))
    })
}

fn unknown_key(key: &str) -> TetherError {
    TetherError::Config(format!(
        "unknown config key '{key}'. Valid keys: {}",
        VALID_KEYS.join(", ")
    ))
}
