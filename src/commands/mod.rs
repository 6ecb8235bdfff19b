//! CLI command implementations.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::config::{Config, RemoteSettings};
use crate::coordinator::SyncCoordinator;
use crate::remote::CloudflareListClient;
use crate::store::LocalStore;

pub mod add;
pub mod check;
pub mod list;
pub mod remove;
pub mod rename;
pub mod update;

/// Build the sync engine from the config file and environment. Remote sync
/// is enabled only when Cloudflare credentials are present.
pub(crate) async fn open_engine(config_path: &Path) -> Result<SyncCoordinator> {
    let config = Config::load_or_default(config_path)?;

    let store = LocalStore::open(&config.database)
        .with_context(|| format!("Failed to open database: {:?}", config.database))?;

    let remote = match RemoteSettings::resolve(&config.cloudflare) {
        Some(settings) => Some(Box::new(CloudflareListClient::from_settings(settings)?)
            as Box<dyn crate::remote::RulesList>),
        None => {
            debug!("Cloudflare credentials not configured, running local-only");
            None
        }
    };

    let engine = SyncCoordinator::new(store, remote)
        .await
        .context("Failed to load allowlist")?;
    Ok(engine)
}
