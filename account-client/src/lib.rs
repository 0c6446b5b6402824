//! # account-client
//!
//! Local/remote store synchronization for Blockfall player accounts.
//!
//! This is the library the game links against. It keeps an on-device
//! SQLite store and the networked account service loosely consistent:
//! some operations dual-write, some fall back, and the invariant-critical
//! ones roll the local side back when the remote side fails.
//!
//! ## Features
//!
//! - **Capability Traits**: Pluggable [`LocalStore`] / [`RemoteStore`]
//!   implementations (SQLite, HTTP, mock)
//! - **Compensating Rollback**: `delete_user`, `add_friend`, and
//!   `delete_friend` leave both stores agreeing or touch neither
//! - **Connectivity Gating**: an advisory [`ConnectivityProbe`] skips
//!   obviously-doomed remote calls; the call's own failure stays the
//!   authoritative signal
//! - **Pure Policy Core**: session and validation logic lives in
//!   `account-core` with no I/O
//!
//! ## Example
//!
//! ```ignore
//! use account_client::{SqliteLocalStore, HttpRemoteStore, StaticProbe,
//!                      SyncConfig, SyncCoordinator};
//!
//! let config = SyncConfig::default();
//! let local = SqliteLocalStore::open(&config.local.database).await?;
//! let remote = HttpRemoteStore::new(&config.remote.endpoint, config.remote_timeout())?;
//! let coordinator = SyncCoordinator::new(&config, local, remote, StaticProbe::online());
//!
//! coordinator.add_user("deadbeef", "wachtwoord").await?;
//! coordinator.login("deadbeef", "wachtwoord").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
mod locks;
pub mod probe;
pub mod store;

pub use config::{ConfigError, LocalConfig, PolicyConfig, RemoteConfig, SyncConfig};
pub use coordinator::SyncCoordinator;
pub use probe::{ConnectivityProbe, StaticProbe};
pub use store::{
    HttpRemoteStore, LocalStore, MockLocalStore, MockRemoteStore, RemoteResult, RemoteStore,
    SqliteLocalStore, StoreResult,
};
