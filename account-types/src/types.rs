//! Plain value types shared across the account crates.

use serde::{Deserialize, Serialize};

/// Sentinel seed value returned when no seed is available (offline, or the
/// remote store has none for this key).
pub const NO_SEED: i64 = -1;

/// The highest-scoring friend of a user, as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopFriend {
    /// The friend's username.
    pub name: String,
    /// The friend's high score.
    pub score: i64,
}
