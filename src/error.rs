//! Error types for Allowgate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid IP or CIDR: {0}")]
    InvalidIp(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Cloudflare API request failed: {0}")]
    Remote(String),

    #[error("Cloudflare rules list not found by name: {0}")]
    ListNotFound(String),

    #[error("Cloudflare account has no rules lists")]
    NoLists,
}

/// A failed dual-store operation: the primary error plus any warnings
/// produced while undoing partially applied work.
///
/// Compensation is best-effort. A failed undo never replaces the primary
/// error; it is recorded here and logged by the coordinator.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct SyncError {
    #[source]
    pub source: Error,
    pub compensation: Vec<String>,
}

impl From<Error> for SyncError {
    fn from(source: Error) -> Self {
        Self {
            source,
            compensation: Vec::new(),
        }
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        Error::from(e).into()
    }
}
