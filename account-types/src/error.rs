//! Error types for the account sync layer.
//!
//! Store implementations never panic through their traits: every failure is
//! one of the typed values below. The coordinator folds both store error
//! families into [`SyncError`], which names the failing phase without
//! changing which calls succeed or fail.

use thiserror::Error;

/// Errors reported by a local store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store engine itself failed (I/O error, closed pool).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store declined the operation (duplicate username, bad
    /// credential, missing row).
    #[error("operation rejected: {0}")]
    Rejected(String),
}

/// Errors reported by a remote store implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote service could not be reached, or did not answer within
    /// the deadline. Timeouts land here.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// The remote service answered and declined the operation.
    #[error("remote rejected: {0}")]
    Rejected(String),
}

/// Failure surfaced by the sync coordinator.
///
/// Every variant maps onto a `false` outcome of the historical boolean
/// contract; the variant only adds which phase failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local store failed or declined.
    #[error("local store failure: {0}")]
    Local(#[from] StoreError),

    /// No network, or the remote store did not answer in time.
    #[error("remote unreachable: {0}")]
    RemoteUnreachable(String),

    /// The remote store answered and declined.
    #[error("remote rejected: {0}")]
    RemoteRejected(String),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unreachable(reason) => Self::RemoteUnreachable(reason),
            RemoteError::Rejected(reason) => Self::RemoteRejected(reason),
        }
    }
}

/// Result alias for coordinator operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::Rejected("username 'x' already exists".into());
        assert_eq!(
            err.to_string(),
            "operation rejected: username 'x' already exists"
        );
    }

    #[test]
    fn remote_error_maps_to_matching_phase() {
        let err: SyncError = RemoteError::Unreachable("timed out".into()).into();
        assert!(matches!(err, SyncError::RemoteUnreachable(_)));

        let err: SyncError = RemoteError::Rejected("bad credential".into()).into();
        assert!(matches!(err, SyncError::RemoteRejected(_)));
    }

    #[test]
    fn store_error_maps_to_local_phase() {
        let err: SyncError = StoreError::Unavailable("pool closed".into()).into();
        assert!(matches!(err, SyncError::Local(_)));
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
        assert_send_sync::<RemoteError>();
        assert_send_sync::<SyncError>();
    }
}
