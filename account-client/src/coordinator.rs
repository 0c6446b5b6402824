//! The synchronization coordinator.
//!
//! [`SyncCoordinator`] owns the policy that keeps the local and remote
//! stores loosely consistent. It is constructed once at startup and handed
//! (or injected) into every caller; it holds no account data of its own,
//! only the per-username session map and the last fetched top score.
//!
//! Three kinds of operation:
//! - **dual-write, best-effort**: the local result is the result; the
//!   remote leg is attempted when the probe reports a network and its
//!   failure is only logged (`login`, `add_user`, `set_high_score`).
//! - **all-or-nothing**: the local mutation is reversed when the remote
//!   leg fails, so both stores agree (`delete_user`, `add_friend`,
//!   `delete_friend`).
//! - **remote-only**: seeds, passwords, top friends, remote session
//!   status; offline these answer with a sentinel or fail fast.
//!
//! The connectivity probe is advisory. Every remote call carries its own
//! deadline, and the call's failure - not the probe - is what triggers
//! fallback or compensation.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use account_core::{validate_username, DeleteFriendResult, SessionEvent, SessionState};
use account_types::{RemoteError, SyncError, SyncResult, TopFriend, NO_SEED};
use dashmap::DashMap;
use tokio::time::timeout;

use crate::config::SyncConfig;
use crate::locks::UserLocks;
use crate::probe::ConnectivityProbe;
use crate::store::{LocalStore, RemoteResult, RemoteStore};

/// Orchestrates every account operation against the two stores.
pub struct SyncCoordinator<L, R, P> {
    local: L,
    remote: R,
    probe: P,
    remote_timeout: Duration,
    delete_friend_result: DeleteFriendResult,
    sessions: DashMap<String, SessionState>,
    last_top_score: AtomicI64,
    locks: UserLocks,
}

impl<L, R, P> SyncCoordinator<L, R, P>
where
    L: LocalStore,
    R: RemoteStore,
    P: ConnectivityProbe,
{
    /// Create a coordinator over the given collaborators.
    pub fn new(config: &SyncConfig, local: L, remote: R, probe: P) -> Self {
        Self {
            local,
            remote,
            probe,
            remote_timeout: config.remote_timeout(),
            delete_friend_result: config.policy.delete_friend_result,
            sessions: DashMap::new(),
            last_top_score: AtomicI64::new(0),
            locks: UserLocks::new(),
        }
    }

    /// Run a remote call under the configured deadline.
    ///
    /// A timeout is a remote failure like any other.
    async fn remote_call<T, F>(&self, fut: F) -> RemoteResult<T>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        match timeout(self.remote_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Unreachable(format!(
                "no response within {:?}",
                self.remote_timeout
            ))),
        }
    }

    fn apply_session_event(&self, username: &str, event: SessionEvent) {
        let mut entry = self.sessions.entry(username.to_string()).or_default();
        let next = entry.on_event(event);
        *entry = next;
    }

    /// The session state for a username. `LoggedOut` if never seen.
    pub fn session_state(&self, username: &str) -> SessionState {
        self.sessions
            .get(username)
            .map(|state| *state)
            .unwrap_or_default()
    }

    /// The score of the most recently fetched top friend; 0 at startup.
    pub fn last_top_score(&self) -> i64 {
        self.last_top_score.load(Ordering::Relaxed)
    }

    /// Log the user in.
    ///
    /// The local credential check is authoritative: if it rejects, the
    /// call fails. The remote session is a best-effort mirror whose
    /// failure never fails the call.
    pub async fn login(&self, username: &str, password: &str) -> SyncResult<()> {
        let _guard = self.locks.acquire(username).await;

        self.local.login(username, password).await?;
        self.apply_session_event(username, SessionEvent::LocalLoginSucceeded);

        if self.probe.is_connected() {
            match self.remote_call(self.remote.login(username, password)).await {
                Ok(()) => {
                    self.apply_session_event(username, SessionEvent::RemoteLoginSucceeded);
                }
                Err(err) => {
                    tracing::warn!(username, %err, "remote login failed; multiplayer unavailable");
                }
            }
        }

        Ok(())
    }

    /// Log the user out of both stores. Fire-and-forget.
    pub async fn logout(&self, username: &str) {
        let _guard = self.locks.acquire(username).await;

        if let Err(err) = self.local.logout(username).await {
            tracing::warn!(username, %err, "local logout failed");
        }
        // The local logout closes the session, whatever the remote leg does.
        self.apply_session_event(username, SessionEvent::LogoutRequested);

        if self.probe.is_connected() {
            if let Err(err) = self.remote_call(self.remote.logout(username)).await {
                tracing::warn!(username, %err, "remote logout failed");
            }
        }
    }

    /// Create an account in both stores.
    ///
    /// The local add's outcome is the call's outcome. A remote failure
    /// leaves a local-only account: there is no rollback and no retry
    /// queue, the drift is accepted.
    pub async fn add_user(&self, username: &str, password: &str) -> SyncResult<()> {
        let _guard = self.locks.acquire(username).await;

        // Advisory only: bad names are logged, never refused.
        for warning in validate_username(username) {
            tracing::warn!(username, %warning, "username validation");
        }

        let local_result = self.local.add_user(username, password).await;
        if let Err(err) = &local_result {
            tracing::warn!(username, %err, "could not add user to the local store");
        }

        if self.probe.is_connected() {
            if let Err(err) = self.remote_call(self.remote.add_user(username, password)).await {
                tracing::warn!(username, %err, "could not add user to the remote store");
            }
        }

        Ok(local_result?)
    }

    /// Delete the account from both stores, or from neither.
    pub async fn delete_user(&self, username: &str, password: &str) -> SyncResult<()> {
        let _guard = self.locks.acquire(username).await;

        self.local.delete_user(username, password).await?;

        let remote_result = if self.probe.is_connected() {
            self.remote_call(self.remote.delete_user(username, password))
                .await
        } else {
            Err(RemoteError::Unreachable("network is not connected".into()))
        };

        match remote_result {
            Ok(()) => Ok(()),
            Err(err) => {
                // Compensate: restore the local account so the stores agree.
                if let Err(restore) = self.local.add_user(username, password).await {
                    tracing::error!(username, %restore, "failed to restore local account");
                }
                Err(err.into())
            }
        }
    }

    /// Store a high score locally and replicate it best-effort.
    pub async fn set_high_score(&self, username: &str, score: i64) {
        let _guard = self.locks.acquire(username).await;

        if let Err(err) = self.local.set_high_score(username, score).await {
            tracing::warn!(username, score, %err, "local high score write failed");
        }

        if self.probe.is_connected() {
            if let Err(err) = self
                .remote_call(self.remote.set_high_score(username, score))
                .await
            {
                tracing::warn!(username, score, %err, "high score replication failed");
            }
        }
    }

    /// Read the high score.
    ///
    /// The remote value is preferred only when the user is remotely
    /// authenticated right now; the local value answers in every other
    /// combination, including when the remote read itself fails.
    pub async fn get_high_score(&self, username: &str) -> SyncResult<i64> {
        if self.probe.is_connected() {
            if let Ok(true) = self
                .remote_call(self.remote.get_login_status(username))
                .await
            {
                match self.remote_call(self.remote.get_high_score(username)).await {
                    Ok(score) => return Ok(score),
                    Err(err) => {
                        tracing::debug!(username, %err, "remote score read failed; using local");
                    }
                }
            }
        }

        Ok(self.local.get_high_score(username).await?)
    }

    /// Change the credential. The remote store is the sole authority.
    pub async fn set_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> SyncResult<()> {
        let _guard = self.locks.acquire(username).await;

        if !self.probe.is_connected() {
            return Err(SyncError::RemoteUnreachable(
                "network is not connected".into(),
            ));
        }

        Ok(self
            .remote_call(self.remote.set_password(username, old_password, new_password))
            .await?)
    }

    /// Add a friend edge to both stores, or to neither.
    ///
    /// Needs the network: the friend must be discoverable remotely before
    /// anything is written. The local edge is tentative until the remote
    /// add commits; on remote failure it is rolled back.
    pub async fn add_friend(&self, owner: &str, friend: &str) -> SyncResult<()> {
        let _guard = self.locks.acquire(owner).await;

        if !self.probe.is_connected() {
            return Err(SyncError::RemoteUnreachable(
                "adding friends needs a network connection".into(),
            ));
        }

        match self.remote_call(self.remote.find_user(friend)).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(SyncError::RemoteRejected(format!("no such user '{friend}'")));
            }
            Err(err) => return Err(err.into()),
        }

        self.local.add_friend(owner, friend).await?;

        match self.remote_call(self.remote.add_friend(owner, friend)).await {
            Ok(()) => Ok(()),
            Err(err) => {
                // Compensate: drop the tentative local edge.
                if let Err(rollback) = self.local.delete_friend(owner, friend).await {
                    tracing::error!(owner, friend, %rollback, "failed to roll back local edge");
                }
                Err(err.into())
            }
        }
    }

    /// Remove a friend edge from both stores, or leave it in both.
    ///
    /// The local delete gates the operation. If the remote delete then
    /// fails, the local edge is re-added; what the call reports in that
    /// case follows the configured [`DeleteFriendResult`].
    pub async fn delete_friend(&self, owner: &str, friend: &str) -> SyncResult<()> {
        let _guard = self.locks.acquire(owner).await;

        self.local.delete_friend(owner, friend).await?;

        let remote_result = if self.probe.is_connected() {
            self.remote_call(self.remote.delete_friend(owner, friend))
                .await
        } else {
            Err(RemoteError::Unreachable("network is not connected".into()))
        };

        match remote_result {
            Ok(()) => Ok(()),
            Err(err) => {
                let restored = self.local.add_friend(owner, friend).await;
                match self.delete_friend_result {
                    // Historical contract: the compensating add's outcome
                    // is the call's outcome.
                    DeleteFriendResult::CompensationResult => Ok(restored?),
                    DeleteFriendResult::DeleteResult => {
                        if let Err(restore) = restored {
                            tracing::error!(owner, friend, %restore, "failed to restore local edge");
                        }
                        Err(err.into())
                    }
                }
            }
        }
    }

    /// Seed of the shared daily challenge, or [`NO_SEED`].
    ///
    /// Deliberately not probe-gated: the remote call's own failure is the
    /// only signal.
    pub async fn daily_challenge_seed(&self) -> i64 {
        match self
            .remote_call(self.remote.get_daily_challenge_seed())
            .await
        {
            Ok(seed) => seed,
            Err(err) => {
                tracing::warn!(%err, "daily challenge seed unavailable");
                NO_SEED
            }
        }
    }

    /// The per-user challenge seed, or [`NO_SEED`] when offline or
    /// unavailable. There is no local seed cache.
    pub async fn block_seed(&self, username: &str) -> i64 {
        if !self.probe.is_connected() {
            return NO_SEED;
        }

        match self.remote_call(self.remote.get_block_seed(username)).await {
            Ok(seed) => seed,
            Err(err) => {
                tracing::warn!(username, %err, "block seed unavailable");
                NO_SEED
            }
        }
    }

    /// Store a per-user challenge seed remotely.
    ///
    /// Offline the write is dropped - there is no outbox.
    pub async fn set_block_seed(&self, username: &str, seed: i64) {
        if !self.probe.is_connected() {
            return;
        }

        if let Err(err) = self
            .remote_call(self.remote.set_block_seed(username, seed))
            .await
        {
            tracing::warn!(username, seed, %err, "block seed write failed");
        }
    }

    /// The highest-scoring friend, or `None` when offline or on failure.
    pub async fn top_friend(&self, username: &str) -> Option<TopFriend> {
        if !self.probe.is_connected() {
            return None;
        }

        match self.remote_call(self.remote.get_top_friend(username)).await {
            Ok(Some(friend)) => {
                self.last_top_score.store(friend.score, Ordering::Relaxed);
                Some(friend)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(username, %err, "top friend lookup failed");
                None
            }
        }
    }

    /// Whether the user's remote session is currently valid. `false`
    /// offline: there is no local notion of "remotely logged in".
    pub async fn login_status(&self, username: &str) -> bool {
        if !self.probe.is_connected() {
            return false;
        }

        match self
            .remote_call(self.remote.get_login_status(username))
            .await
        {
            Ok(status) => status,
            Err(err) => {
                tracing::debug!(username, %err, "remote login status unavailable");
                false
            }
        }
    }

    /// The user's friends, from the local store.
    pub async fn friends_list(&self, username: &str) -> SyncResult<Vec<String>> {
        Ok(self.local.friends_list(username).await?)
    }

    /// Store the session token locally.
    pub async fn set_token(&self, username: &str, token: &str) -> SyncResult<()> {
        let _guard = self.locks.acquire(username).await;
        Ok(self.local.set_token(username, token).await?)
    }

    /// Read the locally stored session token.
    pub async fn token(&self, username: &str) -> SyncResult<Option<String>> {
        Ok(self.local.token(username).await?)
    }

    /// The username logged in on this device, if any.
    pub async fn logged_in_user(&self) -> SyncResult<Option<String>> {
        Ok(self.local.logged_in_user().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProbe;
    use crate::store::{MockLocalStore, MockRemoteStore};

    type TestCoordinator = SyncCoordinator<MockLocalStore, MockRemoteStore, StaticProbe>;

    /// Install a subscriber so `RUST_LOG=debug cargo test` shows the
    /// swallowed remote failures.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn build(
        config: &SyncConfig,
        online: bool,
    ) -> (TestCoordinator, MockLocalStore, MockRemoteStore, StaticProbe) {
        init_tracing();
        let local = MockLocalStore::new();
        let remote = MockRemoteStore::new();
        let probe = StaticProbe::new();
        probe.set_online(online);
        let coordinator =
            SyncCoordinator::new(config, local.clone(), remote.clone(), probe.clone());
        (coordinator, local, remote, probe)
    }

    fn setup_online() -> (TestCoordinator, MockLocalStore, MockRemoteStore, StaticProbe) {
        build(&SyncConfig::default(), true)
    }

    fn setup_offline() -> (TestCoordinator, MockLocalStore, MockRemoteStore, StaticProbe) {
        build(&SyncConfig::default(), false)
    }

    // ===========================================
    // Login / Logout / Session Tests
    // ===========================================

    #[tokio::test]
    async fn local_add_then_offline_login_succeeds() {
        let (coordinator, _local, remote, probe) = setup_offline();

        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();

        // The remote store was never involved.
        assert!(remote.calls().is_empty());
        assert!(!probe.is_connected());
        assert_eq!(
            coordinator.session_state("deadbeef"),
            SessionState::LocalOnly
        );
    }

    #[tokio::test]
    async fn online_login_opens_remote_session() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.insert_user("deadbeef", "wachtwoord");

        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        // add_user already mirrored remotely; clear before login so the
        // call capture below is about login only.
        remote.clear_calls();

        coordinator.login("deadbeef", "wachtwoord").await.unwrap();

        assert_eq!(
            coordinator.session_state("deadbeef"),
            SessionState::LocalAndRemote
        );
        assert_eq!(remote.calls(), vec!["login(deadbeef)".to_string()]);
    }

    #[tokio::test]
    async fn remote_login_failure_does_not_fail_the_call() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.fail_next("add_user", "service down");
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        remote.fail_next("login", "service down");
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();

        // Session stays local-only.
        assert_eq!(
            coordinator.session_state("deadbeef"),
            SessionState::LocalOnly
        );
    }

    #[tokio::test]
    async fn login_with_bad_local_credential_fails() {
        let (coordinator, _local, _remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        let result = coordinator.login("deadbeef", "hunter2").await;
        assert!(matches!(result, Err(SyncError::Local(_))));
        assert_eq!(
            coordinator.session_state("deadbeef"),
            SessionState::LoggedOut
        );
    }

    #[tokio::test]
    async fn logout_closes_session_even_if_remote_leg_fails() {
        let (coordinator, local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();

        remote.fail_next("logout", "service down");
        coordinator.logout("deadbeef").await;

        assert_eq!(
            coordinator.session_state("deadbeef"),
            SessionState::LoggedOut
        );
        assert_eq!(local.calls().last().map(|s| s.contains("logout")), Some(true));
    }

    // ===========================================
    // Add User Tests
    // ===========================================

    #[tokio::test]
    async fn add_user_remote_failure_keeps_local_account() {
        let (coordinator, local, remote, _probe) = setup_online();
        remote.fail_next("add_user", "service down");

        // No rollback: the call still succeeds.
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        assert!(local.has_user("deadbeef"));
        assert!(!remote.has_user("deadbeef"));
    }

    #[tokio::test]
    async fn add_user_bad_characters_warned_not_rejected() {
        let (coordinator, local, _remote, _probe) = setup_offline();

        coordinator.add_user("o'brien", "wachtwoord").await.unwrap();

        assert!(local.has_user("o'brien"));
    }

    #[tokio::test]
    async fn add_user_local_rejection_fails_the_call() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "a").await.unwrap();

        let result = coordinator.add_user("deadbeef", "b").await;
        assert!(matches!(result, Err(SyncError::Local(_))));
        // The remote leg is still attempted, mirroring the dual-write.
        assert_eq!(
            remote
                .calls()
                .iter()
                .filter(|c| c.starts_with("add_user"))
                .count(),
            2
        );
    }

    // ===========================================
    // Delete User Tests (compensation)
    // ===========================================

    #[tokio::test]
    async fn delete_user_removes_from_both_stores() {
        let (coordinator, local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        coordinator
            .delete_user("deadbeef", "wachtwoord")
            .await
            .unwrap();

        assert!(!local.has_user("deadbeef"));
        assert!(!remote.has_user("deadbeef"));
    }

    #[tokio::test]
    async fn delete_user_restores_local_on_remote_failure() {
        let (coordinator, local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        remote.fail_next("delete_user", "service down");
        let result = coordinator.delete_user("deadbeef", "wachtwoord").await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        assert!(local.has_user("deadbeef"));
        // The restored account still accepts the credentials.
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
    }

    #[tokio::test]
    async fn delete_user_offline_restores_and_fails() {
        let (coordinator, local, remote, probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        remote.clear_calls();

        probe.set_online(false);
        let result = coordinator.delete_user("deadbeef", "wachtwoord").await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        assert!(local.has_user("deadbeef"));
        // The remote store was never asked.
        assert!(remote.calls().is_empty());
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
    }

    #[tokio::test]
    async fn delete_user_local_rejection_fails_without_remote_call() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        remote.clear_calls();

        let result = coordinator.delete_user("deadbeef", "hunter2").await;

        assert!(matches!(result, Err(SyncError::Local(_))));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_user_remote_rejection_surfaces_rejected() {
        let (coordinator, local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        remote.reject_next("delete_user", "account locked");
        let result = coordinator.delete_user("deadbeef", "wachtwoord").await;

        assert!(matches!(result, Err(SyncError::RemoteRejected(_))));
        assert!(local.has_user("deadbeef"));
    }

    // ===========================================
    // High Score Tests (read preference)
    // ===========================================

    #[tokio::test]
    async fn high_score_prefers_remote_when_remotely_logged_in() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();

        // The stores disagree; the remote session is valid.
        remote.set_high_score("deadbeef", 500).await.unwrap();
        assert_eq!(coordinator.get_high_score("deadbeef").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn high_score_falls_back_when_offline() {
        let (coordinator, _local, remote, probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
        coordinator.set_high_score("deadbeef", 100).await;
        remote.set_high_score("deadbeef", 500).await.unwrap();

        probe.set_online(false);
        assert_eq!(coordinator.get_high_score("deadbeef").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn high_score_falls_back_when_not_remotely_logged_in() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
        coordinator.set_high_score("deadbeef", 100).await;
        remote.set_high_score("deadbeef", 500).await.unwrap();

        // Online, but the remote session is gone.
        remote.set_login_status("deadbeef", false);
        assert_eq!(coordinator.get_high_score("deadbeef").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn high_score_falls_back_when_remote_read_fails() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
        coordinator.set_high_score("deadbeef", 100).await;
        remote.set_high_score("deadbeef", 500).await.unwrap();

        // The probe and the session check both pass; the read itself dies.
        remote.fail_next("get_high_score", "service down");
        assert_eq!(coordinator.get_high_score("deadbeef").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn set_high_score_replicates_when_online() {
        let (coordinator, local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        coordinator.set_high_score("deadbeef", 2500).await;

        assert_eq!(local.calls().iter().filter(|c| c.starts_with("set_high_score")).count(), 1);
        assert_eq!(remote.get_high_score("deadbeef").await.unwrap(), 2500);
    }

    #[tokio::test]
    async fn set_high_score_swallows_remote_failure() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        remote.fail_next("set_high_score", "service down");
        // No panic, no error surface.
        coordinator.set_high_score("deadbeef", 2500).await;

        assert_eq!(coordinator.get_high_score("deadbeef").await.unwrap(), 2500);
    }

    // ===========================================
    // Password Tests
    // ===========================================

    #[tokio::test]
    async fn set_password_offline_is_unreachable() {
        let (coordinator, _local, remote, _probe) = setup_offline();

        let result = coordinator
            .set_password("deadbeef", "wachtwoord", "nieuw")
            .await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn set_password_remote_refusal_is_rejected() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.insert_user("deadbeef", "wachtwoord");

        let result = coordinator.set_password("deadbeef", "wrong", "nieuw").await;
        assert!(matches!(result, Err(SyncError::RemoteRejected(_))));
    }

    #[tokio::test]
    async fn set_password_succeeds_remotely() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.insert_user("deadbeef", "wachtwoord");

        coordinator
            .set_password("deadbeef", "wachtwoord", "nieuw")
            .await
            .unwrap();

        remote.login("deadbeef", "nieuw").await.unwrap();
    }

    // ===========================================
    // Add Friend Tests (two-phase)
    // ===========================================

    #[tokio::test]
    async fn add_friend_lands_in_both_stores() {
        let (coordinator, local, remote, _probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");

        coordinator.add_friend("deadbeef", "prancingCow").await.unwrap();

        assert!(local.has_friend("deadbeef", "prancingCow"));
        assert!(remote.has_friend("deadbeef", "prancingCow"));
    }

    #[tokio::test]
    async fn add_friend_offline_fails_without_mutation() {
        let (coordinator, local, remote, _probe) = setup_offline();

        let result = coordinator.add_friend("deadbeef", "prancingCow").await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        assert!(!local.has_friend("deadbeef", "prancingCow"));
        assert!(remote.calls().is_empty());
        assert!(local.calls().is_empty());
    }

    #[tokio::test]
    async fn add_friend_unknown_user_fails_without_mutation() {
        let (coordinator, local, _remote, _probe) = setup_online();

        let result = coordinator.add_friend("deadbeef", "nobody").await;

        assert!(matches!(result, Err(SyncError::RemoteRejected(_))));
        assert!(local.calls().is_empty());
    }

    #[tokio::test]
    async fn add_friend_rolls_back_local_edge_on_remote_failure() {
        let (coordinator, local, remote, _probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");
        remote.fail_next("add_friend", "service down");

        let result = coordinator.add_friend("deadbeef", "prancingCow").await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        assert!(!local.has_friend("deadbeef", "prancingCow"));
        assert!(!remote.has_friend("deadbeef", "prancingCow"));
    }

    #[tokio::test]
    async fn add_friend_local_failure_stops_before_remote_commit() {
        let (coordinator, local, remote, _probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");
        local.fail_next("add_friend", "disk full");

        let result = coordinator.add_friend("deadbeef", "prancingCow").await;

        assert!(matches!(result, Err(SyncError::Local(_))));
        assert!(!remote.has_friend("deadbeef", "prancingCow"));
    }

    // ===========================================
    // Delete Friend Tests (policy flag)
    // ===========================================

    #[tokio::test]
    async fn delete_friend_removes_from_both_stores() {
        let (coordinator, local, remote, _probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");
        coordinator.add_friend("deadbeef", "prancingCow").await.unwrap();

        coordinator
            .delete_friend("deadbeef", "prancingCow")
            .await
            .unwrap();

        assert!(!local.has_friend("deadbeef", "prancingCow"));
        assert!(!remote.has_friend("deadbeef", "prancingCow"));
    }

    #[tokio::test]
    async fn delete_friend_local_failure_fails_immediately() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.clear_calls();

        // No such edge locally.
        let result = coordinator.delete_friend("deadbeef", "prancingCow").await;

        assert!(matches!(result, Err(SyncError::Local(_))));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_friend_offline_compensates_and_reports_the_restore() {
        // Default policy: the compensating add's outcome is the outcome,
        // so a clean restore reads as success.
        let (coordinator, local, remote, probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");
        coordinator.add_friend("deadbeef", "prancingCow").await.unwrap();

        probe.set_online(false);
        let result = coordinator.delete_friend("deadbeef", "prancingCow").await;

        assert!(result.is_ok());
        assert!(local.has_friend("deadbeef", "prancingCow"));
        assert!(remote.has_friend("deadbeef", "prancingCow"));
    }

    #[tokio::test]
    async fn delete_friend_policy_surfaces_the_original_failure() {
        let mut config = SyncConfig::default();
        config.policy.delete_friend_result = DeleteFriendResult::DeleteResult;
        let (coordinator, local, remote, probe) = build(&config, true);
        remote.insert_user("prancingCow", "moooooo");
        coordinator.add_friend("deadbeef", "prancingCow").await.unwrap();

        probe.set_online(false);
        let result = coordinator.delete_friend("deadbeef", "prancingCow").await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        // Still compensated either way.
        assert!(local.has_friend("deadbeef", "prancingCow"));
    }

    // ===========================================
    // Seed Tests
    // ===========================================

    #[tokio::test]
    async fn block_seed_offline_is_sentinel() {
        let (coordinator, _local, remote, probe) = setup_online();
        remote.insert_user("deadbeef", "wachtwoord");
        remote.set_block_seed("deadbeef", 777).await.unwrap();

        probe.set_online(false);
        // No local cache: a stored remote value never answers offline.
        assert_eq!(coordinator.block_seed("deadbeef").await, NO_SEED);
    }

    #[tokio::test]
    async fn block_seed_reads_remote_value_when_online() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.insert_user("deadbeef", "wachtwoord");
        remote.set_block_seed("deadbeef", 777).await.unwrap();

        assert_eq!(coordinator.block_seed("deadbeef").await, 777);
    }

    #[tokio::test]
    async fn set_block_seed_offline_is_dropped() {
        let (coordinator, _local, remote, _probe) = setup_offline();

        coordinator.set_block_seed("deadbeef", 777).await;

        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn daily_seed_skips_the_probe() {
        // The daily seed read is not probe-gated: a stale "offline" answer
        // does not block it.
        let (coordinator, _local, remote, _probe) = setup_offline();
        remote.set_daily_seed(31337);

        assert_eq!(coordinator.daily_challenge_seed().await, 31337);
        assert_eq!(
            remote.calls(),
            vec!["get_daily_challenge_seed()".to_string()]
        );
    }

    #[tokio::test]
    async fn daily_seed_failure_is_sentinel() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.fail_next("get_daily_challenge_seed", "service down");

        assert_eq!(coordinator.daily_challenge_seed().await, NO_SEED);
    }

    // ===========================================
    // Top Friend / Login Status Tests
    // ===========================================

    #[tokio::test]
    async fn top_friend_updates_cached_score() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");
        remote.set_high_score("prancingCow", 4200).await.unwrap();
        remote.add_friend("deadbeef", "prancingCow").await.unwrap();

        assert_eq!(coordinator.last_top_score(), 0);
        let top = coordinator.top_friend("deadbeef").await.unwrap();
        assert_eq!(top.name, "prancingCow");
        assert_eq!(coordinator.last_top_score(), 4200);
    }

    #[tokio::test]
    async fn top_friend_offline_is_none() {
        let (coordinator, _local, remote, _probe) = setup_offline();

        assert_eq!(coordinator.top_friend("deadbeef").await, None);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn login_status_offline_is_false() {
        let (coordinator, _local, _remote, _probe) = setup_offline();
        assert!(!coordinator.login_status("deadbeef").await);
    }

    #[tokio::test]
    async fn login_status_tracks_remote_session() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        assert!(!coordinator.login_status("deadbeef").await);
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
        assert!(coordinator.login_status("deadbeef").await);
        assert!(remote.get_login_status("deadbeef").await.unwrap());
    }

    // ===========================================
    // Timeout Tests
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn remote_timeout_triggers_compensation() {
        let (coordinator, local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        // The remote delete never answers; the deadline converts it into
        // an unreachable failure and the local account is restored.
        remote.hang_next("delete_user");
        let result = coordinator.delete_user("deadbeef", "wachtwoord").await;

        assert!(matches!(result, Err(SyncError::RemoteUnreachable(_))));
        assert!(local.has_user("deadbeef"));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_timeout_on_best_effort_leg_is_swallowed() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        remote.hang_next("login");
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();

        assert_eq!(
            coordinator.session_state("deadbeef"),
            SessionState::LocalOnly
        );
    }

    // ===========================================
    // End-to-End Scenarios
    // ===========================================

    #[tokio::test]
    async fn scenario_signup_and_login_with_remote_down() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.fail_next("add_user", "service down");
        remote.fail_next("login", "service down");

        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
    }

    #[tokio::test]
    async fn scenario_add_friend_then_list_contains_them() {
        let (coordinator, _local, remote, _probe) = setup_online();
        remote.insert_user("prancingCow", "moooooo");

        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
        coordinator.add_friend("deadbeef", "prancingCow").await.unwrap();

        let friends = coordinator.friends_list("deadbeef").await.unwrap();
        assert!(friends.contains(&"prancingCow".to_string()));
    }

    #[tokio::test]
    async fn scenario_failed_delete_leaves_working_account() {
        let (coordinator, _local, remote, _probe) = setup_online();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        remote.fail_next("delete_user", "unreachable");
        let result = coordinator.delete_user("deadbeef", "wachtwoord").await;
        assert!(result.is_err());

        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
    }

    // ===========================================
    // Token / Local Passthrough Tests
    // ===========================================

    #[tokio::test]
    async fn token_round_trip_is_local_only() {
        let (coordinator, _local, remote, _probe) = setup_offline();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        coordinator.set_token("deadbeef", "tok-123").await.unwrap();
        assert_eq!(
            coordinator.token("deadbeef").await.unwrap(),
            Some("tok-123".to_string())
        );
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn logged_in_user_reflects_local_session() {
        let (coordinator, _local, _remote, _probe) = setup_offline();
        coordinator.add_user("deadbeef", "wachtwoord").await.unwrap();

        assert_eq!(coordinator.logged_in_user().await.unwrap(), None);
        coordinator.login("deadbeef", "wachtwoord").await.unwrap();
        assert_eq!(
            coordinator.logged_in_user().await.unwrap(),
            Some("deadbeef".to_string())
        );

        coordinator.logout("deadbeef").await;
        assert_eq!(coordinator.logged_in_user().await.unwrap(), None);
    }
}
