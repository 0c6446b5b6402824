//! Network connectivity probes.
//!
//! A probe answers "does the network look reachable right now?". The answer
//! is a snapshot, not a guarantee: a remote call issued immediately after a
//! positive probe may still fail. The coordinator therefore uses the probe
//! only to skip remote calls that would obviously fail, and always treats
//! the remote call's own failure as the authoritative signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Point-in-time network reachability check.
pub trait ConnectivityProbe: Send + Sync {
    /// Whether the network currently looks reachable.
    ///
    /// Must be side-effect-free (logging aside).
    fn is_connected(&self) -> bool;
}

/// A probe backed by a shared flag.
///
/// The platform's network monitor flips the flag as connectivity changes;
/// tests flip it directly.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    online: Arc<AtomicBool>,
}

impl StaticProbe {
    /// Create a probe that reports offline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a probe that reports online.
    pub fn online() -> Self {
        let probe = Self::default();
        probe.set_online(true);
        probe
    }

    /// Update the reported state.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl ConnectivityProbe for StaticProbe {
    fn is_connected(&self) -> bool {
        let connected = self.online.load(Ordering::Relaxed);
        if !connected {
            tracing::debug!("network is not connected");
        }
        connected
    }
}
