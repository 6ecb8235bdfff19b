//! Configuration management for Allowgate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secure string type that zeroizes memory on drop.
/// Used for the Cloudflare API token.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite allowlist database
    pub database: PathBuf,

    /// Cloudflare rules-list settings (token comes from the environment)
    pub cloudflare: CloudflareConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("/var/lib/allowgate/allowgate.db"),
            cloudflare: CloudflareConfig::default(),
        }
    }
}

/// Cloudflare account and list selection. When both `list_id` and
/// `list_name` are unset, the first list on the account is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudflareConfig {
    pub account_id: String,
    pub list_id: Option<String>,
    pub list_name: Option<String>,
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.as_os_str().is_empty() {
            anyhow::bail!("database path cannot be empty");
        }
        Ok(())
    }
}

/// Resolved credentials and list selection for the remote rules list.
/// `None` means remote sync is not configured and the engine runs local-only.
#[derive(Debug)]
pub struct RemoteSettings {
    pub api_token: SecureString,
    pub account_id: String,
    pub list_id: Option<String>,
    pub list_name: Option<String>,
}

impl RemoteSettings {
    /// Combine environment variables with the config file. The API token is
    /// only ever read from `CLOUDFLARE_API_TOKEN`; the other values may come
    /// from either source, with the environment winning.
    pub fn resolve(config: &CloudflareConfig) -> Option<Self> {
        let token = env::var("CLOUDFLARE_API_TOKEN").unwrap_or_default();
        let account_id =
            env::var("CLOUDFLARE_ACCOUNT_ID").unwrap_or_else(|_| config.account_id.clone());
        let list_id = env::var("CLOUDFLARE_LIST_ID")
            .ok()
            .or_else(|| config.list_id.clone());
        let list_name = env::var("CLOUDFLARE_LIST_NAME")
            .ok()
            .or_else(|| config.list_name.clone());

        Self::from_parts(token, account_id, list_id, list_name)
    }

    /// Build settings from explicit values; `None` when the token or the
    /// account id is missing.
    pub fn from_parts(
        token: String,
        account_id: String,
        list_id: Option<String>,
        list_name: Option<String>,
    ) -> Option<Self> {
        if token.is_empty() || account_id.is_empty() {
            return None;
        }
        Some(Self {
            api_token: SecureString::new(token),
            account_id,
            list_id,
            list_name,
        })
    }
}
