//! Store capability traits for the account sync layer.
//!
//! The coordinator talks to two collaborators through these traits: the
//! on-device [`LocalStore`] and the networked [`RemoteStore`]. Both report
//! failure as a typed error value; no implementation panics through the
//! trait.
//!
//! Implementations:
//! - [`SqliteLocalStore`] - SQLite over sqlx (the game's on-device store)
//! - [`HttpRemoteStore`] - JSON POST client for the account service
//! - [`MockLocalStore`] / [`MockRemoteStore`] - in-memory, for tests

mod http;
mod mock;
mod sqlite;

pub use http::HttpRemoteStore;
pub use mock::{MockLocalStore, MockRemoteStore};
pub use sqlite::SqliteLocalStore;

use account_types::{RemoteError, StoreError, TopFriend};
use async_trait::async_trait;

/// Result alias for local store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result alias for remote store operations.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Durable on-device storage for accounts, tokens, friend edges, and
/// cached scores.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Create an account. Rejected if the username is taken.
    async fn add_user(&self, username: &str, password: &str) -> StoreResult<()>;

    /// Delete an account. Rejected if the credential does not match.
    async fn delete_user(&self, username: &str, password: &str) -> StoreResult<()>;

    /// Check credentials and mark the user as locally logged in.
    /// Rejected if the credential does not match.
    async fn login(&self, username: &str, password: &str) -> StoreResult<()>;

    /// Clear the user's locally-logged-in flag.
    async fn logout(&self, username: &str) -> StoreResult<()>;

    /// Store a high score.
    async fn set_high_score(&self, username: &str, score: i64) -> StoreResult<()>;

    /// Read the cached high score.
    async fn get_high_score(&self, username: &str) -> StoreResult<i64>;

    /// Add a directed friend edge. Rejected if it already exists.
    async fn add_friend(&self, owner: &str, friend: &str) -> StoreResult<()>;

    /// Remove a directed friend edge. Rejected if it does not exist.
    async fn delete_friend(&self, owner: &str, friend: &str) -> StoreResult<()>;

    /// All friends of the given owner.
    async fn friends_list(&self, username: &str) -> StoreResult<Vec<String>>;

    /// Store the session token for a user.
    async fn set_token(&self, username: &str, token: &str) -> StoreResult<()>;

    /// Read the session token for a user, if one is stored.
    async fn token(&self, username: &str) -> StoreResult<Option<String>>;

    /// The username currently marked as logged in on this device, if any.
    async fn logged_in_user(&self) -> StoreResult<Option<String>>;
}

/// Networked storage for accounts, friend discovery, scores, and seeds.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create an account on the service.
    async fn add_user(&self, username: &str, password: &str) -> RemoteResult<()>;

    /// Delete an account; the credential must match.
    async fn delete_user(&self, username: &str, password: &str) -> RemoteResult<()>;

    /// Open a remote session.
    async fn login(&self, username: &str, password: &str) -> RemoteResult<()>;

    /// Close the remote session.
    async fn logout(&self, username: &str) -> RemoteResult<()>;

    /// Change the credential; the old one must match.
    async fn set_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> RemoteResult<()>;

    /// Replicate a high score.
    async fn set_high_score(&self, username: &str, score: i64) -> RemoteResult<()>;

    /// Read the service-side high score.
    async fn get_high_score(&self, username: &str) -> RemoteResult<i64>;

    /// Whether a username exists on the service (friend discovery).
    async fn find_user(&self, username: &str) -> RemoteResult<bool>;

    /// Add a directed friend edge on the service.
    async fn add_friend(&self, owner: &str, friend: &str) -> RemoteResult<()>;

    /// Remove a directed friend edge on the service.
    async fn delete_friend(&self, owner: &str, friend: &str) -> RemoteResult<()>;

    /// The highest-scoring friend of a user, if they have any friends.
    async fn get_top_friend(&self, username: &str) -> RemoteResult<Option<TopFriend>>;

    /// The per-user challenge seed, or [`account_types::NO_SEED`] if none
    /// is stored.
    async fn get_block_seed(&self, username: &str) -> RemoteResult<i64>;

    /// Store a per-user challenge seed.
    async fn set_block_seed(&self, username: &str, seed: i64) -> RemoteResult<()>;

    /// The seed of the shared daily challenge.
    async fn get_daily_challenge_seed(&self) -> RemoteResult<i64>;

    /// Whether the user's remote session is currently valid.
    async fn get_login_status(&self, username: &str) -> RemoteResult<bool>;
}
