//! Durable local store for allowlist entries and operational settings.
//!
//! Backed by SQLite. All mutations run inside transactions; rowcounts are
//! reported back as booleans so callers can distinguish "nothing happened"
//! from a hard failure.

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::Error;

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_SESSION_TIMEOUT: i64 = 86400;
const DEFAULT_PER_PAGE: i64 = 10;

/// One allowlist row: a plain address or CIDR block keyed by its exact
/// string representation, with second-precision local-clock timestamps.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AllowedIpEntry {
    pub ip: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AllowedIpEntry {
    /// Build an entry stamped with the current time.
    pub fn new(ip: impl Into<String>, description: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            ip: ip.into(),
            description: description.into(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Current local time formatted as `YYYY-MM-DD HH:MM:SS`.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Thread-safe SQLite wrapper owning the `allowed_ips` and `config` tables.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Idempotently create tables and seed config defaults. Existing config
    /// values are never overwritten.
    fn init_schema(&self) -> Result<(), Error> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS allowed_ips (
                    ip TEXT PRIMARY KEY,
                    description TEXT,
                    created_at TEXT,
                    updated_at TEXT
                );

                CREATE TABLE IF NOT EXISTS config (
                    key TEXT PRIMARY KEY,
                    value TEXT
                );
                "#,
            )?;
        }

        if self.get_config("admin_password")?.is_none() {
            self.set_config("admin_password", &hash_password(DEFAULT_ADMIN_PASSWORD))?;
        }
        if self.get_config("session_timeout")?.is_none() {
            self.set_config("session_timeout", &DEFAULT_SESSION_TIMEOUT.to_string())?;
        }
        if self.get_config("default_per_page")?.is_none() {
            self.set_config("default_per_page", &DEFAULT_PER_PAGE.to_string())?;
        }

        Ok(())
    }

    // ==================== Allowlist rows ====================

    /// Insert an entry, ignoring the insert when the key already exists.
    /// Returns whether a row was actually written.
    pub fn insert(&self, entry: &AllowedIpEntry) -> Result<bool, Error> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "INSERT OR IGNORE INTO allowed_ips (ip, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.ip,
                entry.description,
                entry.created_at,
                entry.updated_at
            ],
        )?;
        Ok(rows > 0)
    }

    /// Update description and updated_at for an existing key.
    /// Returns false when no row matched.
    pub fn update(&self, ip: &str, description: &str) -> Result<bool, Error> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE allowed_ips SET description = ?1, updated_at = ?2 WHERE ip = ?3",
            params![description, now_timestamp(), ip],
        )?;
        Ok(rows > 0)
    }

    /// Delete a row. Returns false when no row matched.
    pub fn delete(&self, ip: &str) -> Result<bool, Error> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM allowed_ips WHERE ip = ?1", params![ip])?;
        Ok(rows > 0)
    }

    /// Re-key a row in a single transaction, carrying the original
    /// created_at forward. Either both halves apply or neither does.
    /// Returns false when the old row was absent.
    pub fn rename(
        &self,
        old_ip: &str,
        new_ip: &str,
        description: &str,
        created_at: &str,
    ) -> Result<bool, Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let deleted = tx.execute("DELETE FROM allowed_ips WHERE ip = ?1", params![old_ip])?;
        if deleted == 0 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO allowed_ips (ip, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![new_ip, description, created_at, now_timestamp()],
        )?;

        tx.commit()?;
        Ok(true)
    }

    /// All entries, oldest first. Rows sharing a timestamp keep insertion
    /// order.
    pub fn list(&self) -> Result<Vec<AllowedIpEntry>, Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ip, description, created_at, updated_at FROM allowed_ips
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(AllowedIpEntry {
                    ip: row.get(0)?,
                    description: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    created_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    updated_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    // ==================== Config key/value ====================

    pub fn get_config(&self, key: &str) -> Result<Option<String>, Error> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row("SELECT value FROM config WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Update-or-insert a config value.
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), Error> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE config SET value = ?1 WHERE key = ?2",
            params![value, key],
        )?;
        if rows == 0 {
            conn.execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        Ok(())
    }

    /// Stored admin credential hash, falling back to the seeded default.
    pub fn admin_password_hash(&self) -> Result<String, Error> {
        Ok(self
            .get_config("admin_password")?
            .unwrap_or_else(|| hash_password(DEFAULT_ADMIN_PASSWORD)))
    }

    pub fn set_admin_password(&self, password: &str) -> Result<(), Error> {
        self.set_config("admin_password", &hash_password(password))
    }

    /// Session timeout in seconds, clamped to [300, 86400].
    pub fn session_timeout(&self) -> Result<i64, Error> {
        let raw = self
            .get_config("session_timeout")?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(1800);
        Ok(raw.clamp(300, 86400))
    }

    /// Default page size for listings, clamped to [1, 100].
    pub fn default_per_page(&self) -> Result<i64, Error> {
        let raw = self
            .get_config("default_per_page")?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(10);
        Ok(raw.clamp(1, 100))
    }
}

/// SHA-256 hex digest of a credential.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ip: &str, desc: &str) -> AllowedIpEntry {
        AllowedIpEntry::new(ip, desc)
    }

    #[test]
    fn test_insert_and_list() {
        let store = LocalStore::open_memory().unwrap();
        assert!(store.insert(&entry("10.0.0.1", "office")).unwrap());

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, "10.0.0.1");
        assert_eq!(entries[0].description, "office");
    }

    #[test]
    fn test_insert_duplicate_is_ignored() {
        let store = LocalStore::open_memory().unwrap();
        assert!(store.insert(&entry("10.0.0.1", "first")).unwrap());
        assert!(!store.insert(&entry("10.0.0.1", "second")).unwrap());

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "first");
    }

    #[test]
    fn test_update_missing_row() {
        let store = LocalStore::open_memory().unwrap();
        assert!(!store.update("10.0.0.1", "nope").unwrap());

        store.insert(&entry("10.0.0.1", "old")).unwrap();
        assert!(store.update("10.0.0.1", "new").unwrap());
        assert_eq!(store.list().unwrap()[0].description, "new");
    }

    #[test]
    fn test_delete() {
        let store = LocalStore::open_memory().unwrap();
        store.insert(&entry("10.0.0.1", "")).unwrap();
        assert!(store.delete("10.0.0.1").unwrap());
        assert!(!store.delete("10.0.0.1").unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_rename_carries_created_at() {
        let store = LocalStore::open_memory().unwrap();
        let mut e = entry("10.0.0.1", "office");
        e.created_at = "2020-01-01 00:00:00".to_string();
        e.updated_at = e.created_at.clone();
        store.insert(&e).unwrap();

        assert!(store
            .rename("10.0.0.1", "10.0.0.2", "moved", "2020-01-01 00:00:00")
            .unwrap());

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ip, "10.0.0.2");
        assert_eq!(entries[0].description, "moved");
        assert_eq!(entries[0].created_at, "2020-01-01 00:00:00");
    }

    #[test]
    fn test_rename_missing_old_row() {
        let store = LocalStore::open_memory().unwrap();
        assert!(!store
            .rename("10.0.0.1", "10.0.0.2", "", "2020-01-01 00:00:00")
            .unwrap());
    }

    #[test]
    fn test_rename_onto_existing_key_rolls_back() {
        let store = LocalStore::open_memory().unwrap();
        store.insert(&entry("10.0.0.1", "one")).unwrap();
        store.insert(&entry("10.0.0.2", "two")).unwrap();

        let result = store.rename("10.0.0.1", "10.0.0.2", "clash", "2020-01-01 00:00:00");
        assert!(result.is_err());

        // The delete half must have been rolled back
        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.ip == "10.0.0.1"));
    }

    #[test]
    fn test_list_ordered_by_created_at() {
        let store = LocalStore::open_memory().unwrap();
        let mut older = entry("10.0.0.2", "");
        older.created_at = "2020-01-01 00:00:00".to_string();
        let mut newer = entry("10.0.0.1", "");
        newer.created_at = "2021-01-01 00:00:00".to_string();
        store.insert(&newer).unwrap();
        store.insert(&older).unwrap();

        let ips: Vec<_> = store.list().unwrap().into_iter().map(|e| e.ip).collect();
        assert_eq!(ips, vec!["10.0.0.2", "10.0.0.1"]);
    }

    #[test]
    fn test_config_roundtrip() {
        let store = LocalStore::open_memory().unwrap();
        assert!(store.get_config("missing").unwrap().is_none());

        store.set_config("k", "v1").unwrap();
        assert_eq!(store.get_config("k").unwrap().as_deref(), Some("v1"));

        store.set_config("k", "v2").unwrap();
        assert_eq!(store.get_config("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_defaults_seeded_once() {
        let store = LocalStore::open_memory().unwrap();
        assert_eq!(store.session_timeout().unwrap(), 86400);
        assert_eq!(store.default_per_page().unwrap(), 10);
        assert!(store.get_config("admin_password").unwrap().is_some());

        // Re-running schema init must not clobber explicit values
        store.set_config("session_timeout", "600").unwrap();
        store.init_schema().unwrap();
        assert_eq!(store.session_timeout().unwrap(), 600);
    }

    #[test]
    fn test_settings_are_clamped() {
        let store = LocalStore::open_memory().unwrap();
        store.set_config("session_timeout", "10").unwrap();
        assert_eq!(store.session_timeout().unwrap(), 300);
        store.set_config("session_timeout", "999999").unwrap();
        assert_eq!(store.session_timeout().unwrap(), 86400);

        store.set_config("default_per_page", "0").unwrap();
        assert_eq!(store.default_per_page().unwrap(), 1);
        store.set_config("default_per_page", "500").unwrap();
        assert_eq!(store.default_per_page().unwrap(), 100);
    }

    #[test]
    fn test_admin_password() {
        let store = LocalStore::open_memory().unwrap();
        let seeded = store.admin_password_hash().unwrap();
        assert_eq!(seeded, hash_password("admin123"));

        store.set_admin_password("s3cret").unwrap();
        assert_eq!(store.admin_password_hash().unwrap(), hash_password("s3cret"));
    }
}
