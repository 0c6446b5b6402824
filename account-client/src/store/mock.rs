//! Mock stores for testing.
//!
//! In-memory implementations with forcing knobs and call capture. Queue an
//! operation name with [`MockRemoteStore::fail_next`] /
//! [`MockRemoteStore::reject_next`] to make its next invocation fail, or
//! [`MockRemoteStore::hang_next`] to make it sleep past any deadline.
//! Clones share state, so tests can keep a handle for inspection after
//! handing the store to a coordinator.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use account_types::{RemoteError, StoreError, TopFriend, NO_SEED};
use async_trait::async_trait;

use super::{LocalStore, RemoteResult, RemoteStore, StoreResult};

/// How long a hung operation sleeps; far beyond any configured deadline.
const HANG: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Default)]
struct Account {
    password: String,
    token: Option<String>,
    high_score: i64,
    logged_in: bool,
    block_seed: Option<i64>,
}

#[derive(Debug, Default)]
struct MockStoreInner {
    accounts: HashMap<String, Account>,
    friends: HashSet<(String, String)>,
    daily_seed: Option<i64>,
    fail_next: HashMap<String, String>,
    reject_next: HashMap<String, String>,
    hang_next: HashSet<String>,
    calls: Vec<String>,
}

impl MockStoreInner {
    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    /// Take a queued forced failure for `op`, if any. Fail-next wins over
    /// reject-next when both are queued.
    fn forced_failure(&mut self, op: &str) -> Option<(bool, String)> {
        if let Some(error) = self.fail_next.remove(op) {
            return Some((false, error));
        }
        if let Some(reason) = self.reject_next.remove(op) {
            return Some((true, reason));
        }
        None
    }

    fn account(&self, username: &str) -> Result<&Account, String> {
        self.accounts
            .get(username)
            .ok_or_else(|| format!("no such user '{username}'"))
    }

    fn account_mut(&mut self, username: &str) -> Result<&mut Account, String> {
        self.accounts
            .get_mut(username)
            .ok_or_else(|| format!("no such user '{username}'"))
    }

    fn add_account(&mut self, username: &str, password: &str) -> Result<(), String> {
        if self.accounts.contains_key(username) {
            return Err(format!("username '{username}' already exists"));
        }
        self.accounts.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                ..Account::default()
            },
        );
        Ok(())
    }

    fn remove_account(&mut self, username: &str, password: &str) -> Result<(), String> {
        match self.accounts.get(username) {
            Some(account) if account.password == password => {
                self.accounts.remove(username);
                Ok(())
            }
            Some(_) => Err(format!("bad credential for '{username}'")),
            None => Err(format!("no such user '{username}'")),
        }
    }

    fn check_login(&mut self, username: &str, password: &str) -> Result<(), String> {
        match self.accounts.get(username) {
            Some(account) if account.password == password => {
                // One logged-in user per store, like the on-device table.
                for other in self.accounts.values_mut() {
                    other.logged_in = false;
                }
                self.accounts
                    .get_mut(username)
                    .expect("account just checked")
                    .logged_in = true;
                Ok(())
            }
            Some(_) => Err(format!("bad credential for '{username}'")),
            None => Err(format!("no such user '{username}'")),
        }
    }

    fn add_edge(&mut self, owner: &str, friend: &str) -> Result<(), String> {
        if !self
            .friends
            .insert((owner.to_string(), friend.to_string()))
        {
            return Err(format!("'{owner}' already has friend '{friend}'"));
        }
        Ok(())
    }

    fn remove_edge(&mut self, owner: &str, friend: &str) -> Result<(), String> {
        if !self
            .friends
            .remove(&(owner.to_string(), friend.to_string()))
        {
            return Err(format!("'{owner}' has no friend '{friend}'"));
        }
        Ok(())
    }

    fn friends_of(&self, owner: &str) -> Vec<String> {
        let mut friends: Vec<String> = self
            .friends
            .iter()
            .filter(|(o, _)| o == owner)
            .map(|(_, f)| f.clone())
            .collect();
        friends.sort();
        friends
    }
}

/// Shared behavior for both mocks: knobs, call capture, inspection.
macro_rules! mock_store_common {
    ($name:ident) => {
        impl $name {
            /// Create an empty mock store.
            pub fn new() -> Self {
                Self::default()
            }

            /// Seed an account directly, bypassing the trait.
            pub fn insert_user(&self, username: &str, password: &str) {
                let mut inner = self.inner.lock().unwrap();
                let _ = inner.add_account(username, password);
            }

            /// Cause the next invocation of `op` to fail as unavailable /
            /// unreachable with the given error.
            pub fn fail_next(&self, op: &str, error: &str) {
                let mut inner = self.inner.lock().unwrap();
                inner.fail_next.insert(op.to_string(), error.to_string());
            }

            /// Cause the next invocation of `op` to be rejected with the
            /// given reason.
            pub fn reject_next(&self, op: &str, reason: &str) {
                let mut inner = self.inner.lock().unwrap();
                inner.reject_next.insert(op.to_string(), reason.to_string());
            }

            /// Whether an account exists.
            pub fn has_user(&self, username: &str) -> bool {
                let inner = self.inner.lock().unwrap();
                inner.accounts.contains_key(username)
            }

            /// Whether a friend edge exists.
            pub fn has_friend(&self, owner: &str, friend: &str) -> bool {
                let inner = self.inner.lock().unwrap();
                inner
                    .friends
                    .contains(&(owner.to_string(), friend.to_string()))
            }

            /// All operations invoked so far, as `op(args)` strings.
            pub fn calls(&self) -> Vec<String> {
                let inner = self.inner.lock().unwrap();
                inner.calls.clone()
            }

            /// Forget recorded calls.
            pub fn clear_calls(&self) {
                let mut inner = self.inner.lock().unwrap();
                inner.calls.clear();
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self {
                    inner: Arc::clone(&self.inner),
                }
            }
        }
    };
}

/// Mock local store.
#[derive(Debug, Default)]
pub struct MockLocalStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

mock_store_common!(MockLocalStore);

impl MockLocalStore {
    fn guard(&self, op: &str, call: String) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(call);
        match inner.forced_failure(op) {
            Some((true, reason)) => Err(StoreError::Rejected(reason)),
            Some((false, error)) => Err(StoreError::Unavailable(error)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LocalStore for MockLocalStore {
    async fn add_user(&self, username: &str, password: &str) -> StoreResult<()> {
        self.guard("add_user", format!("add_user({username})"))?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .add_account(username, password)
            .map_err(StoreError::Rejected)
    }

    async fn delete_user(&self, username: &str, password: &str) -> StoreResult<()> {
        self.guard("delete_user", format!("delete_user({username})"))?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .remove_account(username, password)
            .map_err(StoreError::Rejected)
    }

    async fn login(&self, username: &str, password: &str) -> StoreResult<()> {
        self.guard("login", format!("login({username})"))?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .check_login(username, password)
            .map_err(StoreError::Rejected)
    }

    async fn logout(&self, username: &str) -> StoreResult<()> {
        self.guard("logout", format!("logout({username})"))?;
        let mut inner = self.inner.lock().unwrap();
        if let Ok(account) = inner.account_mut(username) {
            account.logged_in = false;
        }
        Ok(())
    }

    async fn set_high_score(&self, username: &str, score: i64) -> StoreResult<()> {
        self.guard("set_high_score", format!("set_high_score({username})"))?;
        let mut inner = self.inner.lock().unwrap();
        let account = inner.account_mut(username).map_err(StoreError::Rejected)?;
        account.high_score = score;
        Ok(())
    }

    async fn get_high_score(&self, username: &str) -> StoreResult<i64> {
        self.guard("get_high_score", format!("get_high_score({username})"))?;
        let inner = self.inner.lock().unwrap();
        let account = inner.account(username).map_err(StoreError::Rejected)?;
        Ok(account.high_score)
    }

    async fn add_friend(&self, owner: &str, friend: &str) -> StoreResult<()> {
        self.guard("add_friend", format!("add_friend({owner},{friend})"))?;
        let mut inner = self.inner.lock().unwrap();
        inner.add_edge(owner, friend).map_err(StoreError::Rejected)
    }

    async fn delete_friend(&self, owner: &str, friend: &str) -> StoreResult<()> {
        self.guard("delete_friend", format!("delete_friend({owner},{friend})"))?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .remove_edge(owner, friend)
            .map_err(StoreError::Rejected)
    }

    async fn friends_list(&self, username: &str) -> StoreResult<Vec<String>> {
        self.guard("friends_list", format!("friends_list({username})"))?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.friends_of(username))
    }

    async fn set_token(&self, username: &str, token: &str) -> StoreResult<()> {
        self.guard("set_token", format!("set_token({username})"))?;
        let mut inner = self.inner.lock().unwrap();
        let account = inner.account_mut(username).map_err(StoreError::Rejected)?;
        account.token = Some(token.to_string());
        Ok(())
    }

    async fn token(&self, username: &str) -> StoreResult<Option<String>> {
        self.guard("token", format!("token({username})"))?;
        let inner = self.inner.lock().unwrap();
        let account = inner.account(username).map_err(StoreError::Rejected)?;
        Ok(account.token.clone())
    }

    async fn logged_in_user(&self) -> StoreResult<Option<String>> {
        self.guard("logged_in_user", "logged_in_user()".to_string())?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .iter()
            .find(|(_, account)| account.logged_in)
            .map(|(name, _)| name.clone()))
    }
}

/// Mock remote store.
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

mock_store_common!(MockRemoteStore);

impl MockRemoteStore {
    /// Cause the next invocation of `op` to sleep past any deadline.
    pub fn hang_next(&self, op: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.hang_next.insert(op.to_string());
    }

    /// Force the remote session flag for a user.
    pub fn set_login_status(&self, username: &str, logged_in: bool) {
        let mut inner = self.inner.lock().unwrap();
        if let Ok(account) = inner.account_mut(username) {
            account.logged_in = logged_in;
        }
    }

    /// Set the daily challenge seed the service hands out.
    pub fn set_daily_seed(&self, seed: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.daily_seed = Some(seed);
    }

    async fn guard(&self, op: &str, call: String) -> Result<(), RemoteError> {
        let hang = {
            let mut inner = self.inner.lock().unwrap();
            inner.record(call);
            inner.hang_next.remove(op)
        };
        if hang {
            tokio::time::sleep(HANG).await;
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.forced_failure(op) {
            Some((true, reason)) => Err(RemoteError::Rejected(reason)),
            Some((false, error)) => Err(RemoteError::Unreachable(error)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn add_user(&self, username: &str, password: &str) -> RemoteResult<()> {
        self.guard("add_user", format!("add_user({username})")).await?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .add_account(username, password)
            .map_err(RemoteError::Rejected)
    }

    async fn delete_user(&self, username: &str, password: &str) -> RemoteResult<()> {
        self.guard("delete_user", format!("delete_user({username})"))
            .await?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .remove_account(username, password)
            .map_err(RemoteError::Rejected)
    }

    async fn login(&self, username: &str, password: &str) -> RemoteResult<()> {
        self.guard("login", format!("login({username})")).await?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .check_login(username, password)
            .map_err(RemoteError::Rejected)
    }

    async fn logout(&self, username: &str) -> RemoteResult<()> {
        self.guard("logout", format!("logout({username})")).await?;
        let mut inner = self.inner.lock().unwrap();
        if let Ok(account) = inner.account_mut(username) {
            account.logged_in = false;
        }
        Ok(())
    }

    async fn set_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> RemoteResult<()> {
        self.guard("set_password", format!("set_password({username})"))
            .await?;
        let mut inner = self.inner.lock().unwrap();
        let account = inner.account_mut(username).map_err(RemoteError::Rejected)?;
        if account.password != old_password {
            return Err(RemoteError::Rejected(format!(
                "bad credential for '{username}'"
            )));
        }
        account.password = new_password.to_string();
        Ok(())
    }

    async fn set_high_score(&self, username: &str, score: i64) -> RemoteResult<()> {
        self.guard("set_high_score", format!("set_high_score({username})"))
            .await?;
        let mut inner = self.inner.lock().unwrap();
        let account = inner.account_mut(username).map_err(RemoteError::Rejected)?;
        account.high_score = score;
        Ok(())
    }

    async fn get_high_score(&self, username: &str) -> RemoteResult<i64> {
        self.guard("get_high_score", format!("get_high_score({username})"))
            .await?;
        let inner = self.inner.lock().unwrap();
        let account = inner.account(username).map_err(RemoteError::Rejected)?;
        Ok(account.high_score)
    }

    async fn find_user(&self, username: &str) -> RemoteResult<bool> {
        self.guard("find_user", format!("find_user({username})"))
            .await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.accounts.contains_key(username))
    }

    async fn add_friend(&self, owner: &str, friend: &str) -> RemoteResult<()> {
        self.guard("add_friend", format!("add_friend({owner},{friend})"))
            .await?;
        let mut inner = self.inner.lock().unwrap();
        inner.add_edge(owner, friend).map_err(RemoteError::Rejected)
    }

    async fn delete_friend(&self, owner: &str, friend: &str) -> RemoteResult<()> {
        self.guard("delete_friend", format!("delete_friend({owner},{friend})"))
            .await?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .remove_edge(owner, friend)
            .map_err(RemoteError::Rejected)
    }

    async fn get_top_friend(&self, username: &str) -> RemoteResult<Option<TopFriend>> {
        self.guard("get_top_friend", format!("get_top_friend({username})"))
            .await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .friends_of(username)
            .into_iter()
            .filter_map(|friend| {
                inner
                    .accounts
                    .get(&friend)
                    .map(|account| TopFriend {
                        name: friend,
                        score: account.high_score,
                    })
            })
            .max_by_key(|friend| friend.score))
    }

    async fn get_block_seed(&self, username: &str) -> RemoteResult<i64> {
        self.guard("get_block_seed", format!("get_block_seed({username})"))
            .await?;
        let inner = self.inner.lock().unwrap();
        let account = inner.account(username).map_err(RemoteError::Rejected)?;
        Ok(account.block_seed.unwrap_or(NO_SEED))
    }

    async fn set_block_seed(&self, username: &str, seed: i64) -> RemoteResult<()> {
        self.guard("set_block_seed", format!("set_block_seed({username})"))
            .await?;
        let mut inner = self.inner.lock().unwrap();
        let account = inner.account_mut(username).map_err(RemoteError::Rejected)?;
        account.block_seed = Some(seed);
        Ok(())
    }

    async fn get_daily_challenge_seed(&self) -> RemoteResult<i64> {
        self.guard("get_daily_challenge_seed", "get_daily_challenge_seed()".to_string())
            .await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.daily_seed.unwrap_or(NO_SEED))
    }

    async fn get_login_status(&self, username: &str) -> RemoteResult<bool> {
        self.guard("get_login_status", format!("get_login_status({username})"))
            .await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .accounts
            .get(username)
            .map(|account| account.logged_in)
            .unwrap_or(false))
    }
}
