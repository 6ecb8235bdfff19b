//! # Allowgate - Admin Allowlist Gatekeeper
//!
//! Maintains the "allowed IP" list gating an administrative surface, kept
//! consistent between a local SQLite store and a Cloudflare rules list used
//! at a separate enforcement point.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Allowgate                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: add, remove, update, rename, list, check   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SyncCoordinator                                            │
//! │    ├── remote phase first, local transaction last           │
//! │    └── best-effort compensation on partial failure          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LocalStore (rusqlite)          RemoteListClient (reqwest)  │
//! │    ├── allowed_ips table          ├── lazy list resolution  │
//! │    └── config key/value           └── cursor pagination     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IpMatcher (ipnet)                                          │
//! │    └── exact + CIDR matching, fail closed                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The read path (`is_ip_allowed`) consults only an in-memory snapshot of
//! the local store, rebuilt after every successful mutation; it never calls
//! the remote service. Mutations go remote-first: the remote API has no
//! rollback primitive, so enough pre-state is captured to undo it by hand,
//! and the transactional local side runs last.
//!
//! ## Example Usage
//!
//! ```no_run
//! use allowgate::coordinator::SyncCoordinator;
//! use allowgate::store::LocalStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = LocalStore::open("/var/lib/allowgate/allowgate.db")?;
//!     let mut engine = SyncCoordinator::new(store, None).await?;
//!
//!     engine.add_allowed_ip("192.168.1.0/24", "office").await?;
//!     assert!(engine.is_ip_allowed("192.168.1.77"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and credentials
//! - [`coordinator`] - Dual-store orchestration and access decisions
//! - [`error`] - Error taxonomy
//! - [`matcher`] - IP/CIDR validation and matching
//! - [`remote`] - Cloudflare rules-list client
//! - [`store`] - Durable SQLite store
//! - [`transport`] - HTTP transport seam

pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod matcher;
pub mod remote;
pub mod store;
pub mod transport;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use coordinator::SyncCoordinator;
pub use error::{Error, SyncError};
pub use store::{AllowedIpEntry, LocalStore};
