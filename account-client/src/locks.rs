//! Per-username operation locks.
//!
//! Compensation assumes the local store reflects only the current
//! operation's own prior step, so mutating operations for one username
//! must never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed mutual exclusion for mutating operations.
#[derive(Debug, Default)]
pub(crate) struct UserLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a username, creating it on first use.
    pub async fn acquire(&self, username: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
