//! Per-username session state machine.
//!
//! This module provides a pure, side-effect-free state machine for the
//! session lifecycle. The coordinator feeds it events as the local and
//! remote login legs complete and reads it back for callers.
//!
//! There is no failure state: a failed login simply never produces an
//! event, leaving the session where it was.

/// Session lifecycle for a single username - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session is open.
    #[default]
    LoggedOut,
    /// The local credential check passed; no remote session exists.
    LocalOnly,
    /// Local and remote sessions are both established.
    LocalAndRemote,
}

/// Events fed to the session machine by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The local store accepted the credentials.
    LocalLoginSucceeded,
    /// The remote store accepted the credentials.
    RemoteLoginSucceeded,
    /// Logout was requested; the local logout always runs.
    LogoutRequested,
}

impl SessionState {
    /// Create a machine in the initial state.
    pub fn new() -> Self {
        Self::LoggedOut
    }

    /// Process an event and return the new state.
    ///
    /// This is a pure function. Invalid transitions keep the current state:
    /// a remote login reported without a prior local login changes nothing.
    pub fn on_event(self, event: SessionEvent) -> Self {
        match (self, event) {
            (Self::LoggedOut, SessionEvent::LocalLoginSucceeded) => Self::LocalOnly,
            (Self::LocalOnly, SessionEvent::RemoteLoginSucceeded) => Self::LocalAndRemote,
            // Logout lands in LoggedOut from every state, whatever the
            // remote logout leg did.
            (_, SessionEvent::LogoutRequested) => Self::LoggedOut,
            (state, _) => state,
        }
    }

    /// Whether any session is open.
    pub fn is_logged_in(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }

    /// Whether the remote leg of the session is established.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::LocalAndRemote)
    }
}
