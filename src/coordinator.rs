//! Dual-store sync coordinator.
//!
//! Orchestrates allowlist mutations across the local store and the remote
//! rules list. The remote side has no rollback primitive, so every operation
//! follows the same protocol: validate, capture remote pre-state, apply the
//! remote phase, then run the transactional local phase last; a local
//! failure after remote success triggers best-effort remote compensation.
//! A remote failure never leaves a local change behind, because the local
//! phase simply never runs.
//!
//! Compensation failures are logged and attached to the primary error as
//! warnings; they never replace it.

use tracing::{debug, info, warn};

use crate::error::{Error, SyncError};
use crate::matcher;
use crate::remote::RulesList;
use crate::store::{AllowedIpEntry, LocalStore};

const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    ("127.0.0.1", "Local loopback"),
    ("::1", "IPv6 local loopback"),
];

/// Orchestrates add/remove/update/rename across the local store and the
/// remote rules list, and answers access checks from an in-memory snapshot.
///
/// Single-threaded per invocation: every operation runs to completion before
/// returning, and concurrent callers racing on the same key are not
/// coordinated beyond SQLite's own transaction semantics.
pub struct SyncCoordinator {
    store: LocalStore,
    remote: Option<Box<dyn RulesList>>,
    snapshot: Vec<AllowedIpEntry>,
}

impl SyncCoordinator {
    /// Build a coordinator and load the initial snapshot, bootstrapping an
    /// empty store from the remote list or the loopback defaults.
    pub async fn new(
        store: LocalStore,
        remote: Option<Box<dyn RulesList>>,
    ) -> Result<Self, SyncError> {
        let mut coordinator = Self {
            store,
            remote,
            snapshot: Vec::new(),
        };
        coordinator.load_allowed_ips().await?;
        Ok(coordinator)
    }

    /// Rebuild the snapshot from the local store. An empty store is seeded
    /// first from the remote list (reads only), then from the loopback
    /// defaults when the remote is empty, unreachable, or unconfigured.
    pub async fn load_allowed_ips(&mut self) -> Result<(), SyncError> {
        self.snapshot = self.store.list()?;
        if !self.snapshot.is_empty() {
            return Ok(());
        }

        self.seed_from_remote().await?;
        self.snapshot = self.store.list()?;
        if !self.snapshot.is_empty() {
            return Ok(());
        }

        self.seed_defaults()?;
        self.snapshot = self.store.list()?;
        Ok(())
    }

    /// Seed the local store from the remote listing. Remote failures are
    /// swallowed (the defaults take over); storage failures are not.
    async fn seed_from_remote(&mut self) -> Result<(), Error> {
        let Some(remote) = self.remote.as_mut() else {
            return Ok(());
        };

        let items = match remote.list_items(false).await {
            Ok(items) => items,
            Err(e) => {
                debug!("Skipping remote seed: {}", e);
                return Ok(());
            }
        };

        let now = crate::store::now_timestamp();
        let mut seeded = 0;
        for item in items {
            let Some(ip) = item.address() else { continue };
            if ip.is_empty() || !matcher::validate_format(ip) {
                continue;
            }
            let entry = AllowedIpEntry {
                ip: ip.to_string(),
                description: item.comment_or_empty().to_string(),
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            if self.store.insert(&entry)? {
                seeded += 1;
            }
        }

        if seeded > 0 {
            info!("Seeded {} allowlist entries from the remote list", seeded);
        }
        Ok(())
    }

    fn seed_defaults(&self) -> Result<(), Error> {
        info!("Seeding loopback defaults");
        for (ip, description) in DEFAULT_ENTRIES {
            self.store.insert(&AllowedIpEntry::new(*ip, *description))?;
        }
        Ok(())
    }

    fn find_entry(&self, ip: &str) -> Option<&AllowedIpEntry> {
        self.snapshot.iter().find(|e| e.ip == ip)
    }

    /// The current snapshot, oldest entry first.
    pub fn allowed_ips(&self) -> &[AllowedIpEntry] {
        &self.snapshot
    }

    /// Whether a candidate address is covered by the allowlist. Consults
    /// only the in-memory snapshot; syntactically invalid candidates and
    /// malformed stored entries never match.
    pub fn is_ip_allowed(&self, candidate: &str) -> bool {
        if candidate.parse::<std::net::IpAddr>().is_err() {
            return false;
        }
        self.snapshot
            .iter()
            .any(|entry| matcher::matches(candidate, &entry.ip))
    }

    /// Add an entry to both stores. `Ok(false)` when it already exists.
    pub async fn add_allowed_ip(
        &mut self,
        ip: &str,
        description: &str,
    ) -> Result<bool, SyncError> {
        if !matcher::validate_format(ip) {
            return Err(Error::InvalidIp(ip.to_string()).into());
        }
        if self.find_entry(ip).is_some() {
            return Ok(false);
        }

        let mut pre_existed = false;
        if let Some(remote) = self.remote.as_mut() {
            pre_existed = remote
                .find_by_ip(ip)
                .await
                .map_err(SyncError::from)?
                .is_some();
            remote.upsert(ip, description).await?;
        }

        match self.store.insert(&AllowedIpEntry::new(ip, description)) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Entry for {} appeared concurrently, add not applied", ip);
                return Ok(false);
            }
            Err(e) => {
                let compensation = self.undo_remote_upsert(ip, pre_existed).await;
                return Err(SyncError {
                    source: e,
                    compensation,
                });
            }
        }

        info!("Added {} to allowlist", ip);
        self.load_allowed_ips().await?;
        Ok(true)
    }

    /// Remove an entry from both stores. `Ok(false)` when it is absent.
    pub async fn remove_allowed_ip(&mut self, ip: &str) -> Result<bool, SyncError> {
        let Some(existing) = self.find_entry(ip).cloned() else {
            return Ok(false);
        };

        if let Some(remote) = self.remote.as_mut() {
            remote.delete(ip).await?;
        }

        match self.store.delete(ip) {
            Ok(true) => {}
            Ok(false) => {
                // Row already gone; both stores now agree
                self.load_allowed_ips().await?;
                return Ok(false);
            }
            Err(e) => {
                let compensation = self.restore_remote(ip, &existing.description).await;
                return Err(SyncError {
                    source: e,
                    compensation,
                });
            }
        }

        info!("Removed {} from allowlist", ip);
        self.load_allowed_ips().await?;
        Ok(true)
    }

    /// Change an entry's description in both stores. `Ok(false)` when the
    /// entry is absent.
    pub async fn update_description(
        &mut self,
        ip: &str,
        description: &str,
    ) -> Result<bool, SyncError> {
        let Some(existing) = self.find_entry(ip).cloned() else {
            return Ok(false);
        };

        if let Some(remote) = self.remote.as_mut() {
            remote.update_comment(ip, description).await?;
        }

        match self.store.update(ip, description) {
            Ok(true) => {}
            Ok(false) => {
                self.restore_remote(ip, &existing.description).await;
                self.load_allowed_ips().await?;
                return Ok(false);
            }
            Err(e) => {
                let compensation = self.restore_remote(ip, &existing.description).await;
                return Err(SyncError {
                    source: e,
                    compensation,
                });
            }
        }

        info!("Updated description for {}", ip);
        self.load_allowed_ips().await?;
        Ok(true)
    }

    /// Re-key an entry, carrying its creation time forward. Remote identity
    /// is the IP value itself, so the remote phase runs first with enough
    /// pre-state captured to undo it by hand if the local phase fails.
    ///
    /// `Ok(false)` when `old_ip` is absent or `new_ip` is already taken.
    pub async fn rename_allowed_ip(
        &mut self,
        old_ip: &str,
        new_ip: &str,
        description: &str,
    ) -> Result<bool, SyncError> {
        if !matcher::validate_format(new_ip) {
            return Err(Error::InvalidIp(new_ip.to_string()).into());
        }
        let Some(existing) = self.find_entry(old_ip).cloned() else {
            return Ok(false);
        };
        if old_ip != new_ip && self.find_entry(new_ip).is_some() {
            return Ok(false);
        }

        // Whether new_ip already had a remote item decides the correct
        // compensating action later
        let mut new_item_existed = false;
        if let Some(remote) = self.remote.as_mut() {
            new_item_existed = remote
                .find_by_ip(new_ip)
                .await
                .map_err(SyncError::from)?
                .is_some();

            let remote_phase = async {
                remote.upsert(new_ip, description).await?;
                if old_ip != new_ip {
                    remote.delete(old_ip).await?;
                }
                Ok::<(), Error>(())
            }
            .await;

            if let Err(e) = remote_phase {
                let mut compensation = Vec::new();
                if old_ip != new_ip && !new_item_existed {
                    if let Err(undo) = remote.delete(new_ip).await {
                        compensation
                            .push(format!("failed to undo remote item for {}: {}", new_ip, undo));
                    }
                }
                for w in &compensation {
                    warn!("{}", w);
                }
                return Err(SyncError {
                    source: e,
                    compensation,
                });
            }
        }

        let local_phase = if old_ip == new_ip {
            self.store.update(old_ip, description)
        } else {
            self.store
                .rename(old_ip, new_ip, description, &existing.created_at)
        };

        match local_phase {
            Ok(true) => {}
            Ok(false) => {
                self.compensate_rename(old_ip, new_ip, &existing.description, new_item_existed)
                    .await;
                self.load_allowed_ips().await?;
                return Ok(false);
            }
            Err(e) => {
                let compensation = self
                    .compensate_rename(old_ip, new_ip, &existing.description, new_item_existed)
                    .await;
                return Err(SyncError {
                    source: e,
                    compensation,
                });
            }
        }

        info!("Renamed allowlist entry {} -> {}", old_ip, new_ip);
        self.load_allowed_ips().await?;
        Ok(true)
    }

    /// Best-effort removal of a remote item created by a failed operation.
    async fn undo_remote_upsert(&mut self, ip: &str, pre_existed: bool) -> Vec<String> {
        let mut warnings = Vec::new();
        if pre_existed {
            warnings.push(format!(
                "remote item for {} pre-existed; its comment may have been overwritten",
                ip
            ));
        } else if let Some(remote) = self.remote.as_mut() {
            if let Err(e) = remote.delete(ip).await {
                warnings.push(format!("failed to undo remote item for {}: {}", ip, e));
            }
        }
        for w in &warnings {
            warn!("{}", w);
        }
        warnings
    }

    /// Best-effort restoration of a remote item after a failed local phase.
    async fn restore_remote(&mut self, ip: &str, description: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(remote) = self.remote.as_mut() {
            if let Err(e) = remote.upsert(ip, description).await {
                warnings.push(format!("failed to restore remote item for {}: {}", ip, e));
            }
        }
        for w in &warnings {
            warn!("{}", w);
        }
        warnings
    }

    /// Restore the remote list to its pre-rename shape: drop the new item
    /// (unless it pre-existed) and re-create the old one with its original
    /// description. A same-key rename needs no remote compensation.
    async fn compensate_rename(
        &mut self,
        old_ip: &str,
        new_ip: &str,
        original_description: &str,
        new_item_existed: bool,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        if old_ip != new_ip {
            if let Some(remote) = self.remote.as_mut() {
                if !new_item_existed {
                    if let Err(e) = remote.delete(new_ip).await {
                        warnings.push(format!("failed to undo remote item for {}: {}", new_ip, e));
                    }
                }
                if let Err(e) = remote.upsert(old_ip, original_description).await {
                    warnings.push(format!(
                        "failed to restore remote item for {}: {}",
                        old_ip, e
                    ));
                }
            }
        }
        for w in &warnings {
            warn!("{}", w);
        }
        warnings
    }
}
