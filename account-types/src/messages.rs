//! Protocol messages for the remote account endpoint.
//!
//! The remote store speaks JSON over a single POST endpoint. Each request
//! is one operation against the account service; each answer is one of the
//! small set of response shapes below.

use serde::{Deserialize, Serialize};

use crate::TopFriend;

/// All requests understood by the remote account endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AccountRequest {
    /// Create an account.
    AddUser {
        /// The desired username.
        username: String,
        /// The desired credential.
        password: String,
    },
    /// Delete an account; the credential must match.
    DeleteUser {
        /// The account to delete.
        username: String,
        /// The account's credential.
        password: String,
    },
    /// Open a remote session.
    Login {
        /// The account to log in.
        username: String,
        /// The account's credential.
        password: String,
    },
    /// Close the remote session.
    Logout {
        /// The account to log out.
        username: String,
    },
    /// Change the credential; the old one must match.
    SetPassword {
        /// The account to update.
        username: String,
        /// The current credential.
        old_password: String,
        /// The replacement credential.
        new_password: String,
    },
    /// Replicate a high score.
    SetHighScore {
        /// The account to update.
        username: String,
        /// The new high score.
        score: i64,
    },
    /// Read a high score.
    GetHighScore {
        /// The account to read.
        username: String,
    },
    /// Check whether a username exists (friend discovery).
    FindUser {
        /// The username to look up.
        username: String,
    },
    /// Add a directed friend edge.
    AddFriend {
        /// The user adding a friend.
        owner: String,
        /// The friend being added.
        friend: String,
    },
    /// Remove a directed friend edge.
    DeleteFriend {
        /// The user removing a friend.
        owner: String,
        /// The friend being removed.
        friend: String,
    },
    /// Highest-scoring friend of a user.
    GetTopFriend {
        /// The user whose friends are ranked.
        username: String,
    },
    /// Per-user challenge seed.
    GetBlockSeed {
        /// The user whose seed is requested.
        username: String,
    },
    /// Store a per-user challenge seed.
    SetBlockSeed {
        /// The user whose seed is stored.
        username: String,
        /// The seed value.
        seed: i64,
    },
    /// Seed of the shared daily challenge.
    GetDailyChallengeSeed,
    /// Whether the user's remote session is currently valid.
    GetLoginStatus {
        /// The user whose session is checked.
        username: String,
    },
}

/// All responses produced by the remote account endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AccountResponse {
    /// The operation succeeded with nothing to return.
    Ack,
    /// A boolean answer (`find_user`, `get_login_status`).
    Flag {
        /// The answer.
        value: bool,
    },
    /// A numeric answer (scores, seeds).
    Number {
        /// The answer.
        value: i64,
    },
    /// A top-friend answer.
    TopFriend {
        /// The highest-scoring friend.
        friend: TopFriend,
    },
    /// The query matched nothing (no top friend, no stored seed).
    Empty,
    /// The service declined the operation.
    Rejected {
        /// Why the operation was declined.
        reason: String,
    },
}
