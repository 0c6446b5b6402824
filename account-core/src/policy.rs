//! Named policy switches for ambiguous historical behaviors.

use serde::{Deserialize, Serialize};

/// What `delete_friend` reports when the remote leg fails and the local
/// edge is restored.
///
/// The account service historically reported the outcome of the
/// compensating add, so a successful restore read as overall success even
/// though the edge was never deleted anywhere. Both readings are kept
/// selectable; the historical one is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteFriendResult {
    /// Report the compensating add's outcome (historical behavior).
    #[default]
    CompensationResult,
    /// Report the original remote failure.
    DeleteResult,
}
