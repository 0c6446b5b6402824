//! HTTP implementation of the remote store.
//!
//! Speaks JSON to the account service's single POST endpoint. Transport
//! failures and timeouts map to [`RemoteError::Unreachable`];
//! protocol-level refusals map to [`RemoteError::Rejected`].

use std::time::Duration;

use account_types::{AccountRequest, AccountResponse, RemoteError, TopFriend, NO_SEED};
use async_trait::async_trait;

use super::{RemoteResult, RemoteStore};

/// Path of the account endpoint, relative to the configured base URL.
const ENDPOINT_PATH: &str = "/api/v1/account";

/// HTTP client for the account service.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    url: String,
}

impl HttpRemoteStore {
    /// Create a client for the service at `endpoint` with the given
    /// per-request deadline.
    pub fn new(endpoint: &str, timeout: Duration) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}{}", endpoint.trim_end_matches('/'), ENDPOINT_PATH),
        })
    }

    /// Send one request and parse the response envelope.
    async fn call(&self, request: &AccountRequest) -> RemoteResult<AccountResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(RemoteError::Unreachable(format!(
                "server returned {}",
                response.status()
            )));
        }

        response
            .json::<AccountResponse>()
            .await
            .map_err(|e| RemoteError::Unreachable(format!("bad response body: {e}")))
    }

    async fn ack(&self, request: AccountRequest) -> RemoteResult<()> {
        match self.call(&request).await? {
            AccountResponse::Ack => Ok(()),
            AccountResponse::Rejected { reason } => Err(RemoteError::Rejected(reason)),
            other => Err(unexpected(other)),
        }
    }

    async fn flag(&self, request: AccountRequest) -> RemoteResult<bool> {
        match self.call(&request).await? {
            AccountResponse::Flag { value } => Ok(value),
            AccountResponse::Rejected { reason } => Err(RemoteError::Rejected(reason)),
            other => Err(unexpected(other)),
        }
    }

    async fn number(&self, request: AccountRequest) -> RemoteResult<i64> {
        match self.call(&request).await? {
            AccountResponse::Number { value } => Ok(value),
            // Nothing stored for this key.
            AccountResponse::Empty => Ok(NO_SEED),
            AccountResponse::Rejected { reason } => Err(RemoteError::Rejected(reason)),
            other => Err(unexpected(other)),
        }
    }
}

fn transport_err(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Unreachable(format!("request timed out: {err}"))
    } else {
        RemoteError::Unreachable(err.to_string())
    }
}

fn unexpected(response: AccountResponse) -> RemoteError {
    RemoteError::Unreachable(format!("unexpected response: {response:?}"))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn add_user(&self, username: &str, password: &str) -> RemoteResult<()> {
        self.ack(AccountRequest::AddUser {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn delete_user(&self, username: &str, password: &str) -> RemoteResult<()> {
        self.ack(AccountRequest::DeleteUser {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn login(&self, username: &str, password: &str) -> RemoteResult<()> {
        self.ack(AccountRequest::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    async fn logout(&self, username: &str) -> RemoteResult<()> {
        self.ack(AccountRequest::Logout {
            username: username.to_string(),
        })
        .await
    }

    async fn set_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> RemoteResult<()> {
        self.ack(AccountRequest::SetPassword {
            username: username.to_string(),
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        })
        .await
    }

    async fn set_high_score(&self, username: &str, score: i64) -> RemoteResult<()> {
        self.ack(AccountRequest::SetHighScore {
            username: username.to_string(),
            score,
        })
        .await
    }

    async fn get_high_score(&self, username: &str) -> RemoteResult<i64> {
        self.number(AccountRequest::GetHighScore {
            username: username.to_string(),
        })
        .await
    }

    async fn find_user(&self, username: &str) -> RemoteResult<bool> {
        self.flag(AccountRequest::FindUser {
            username: username.to_string(),
        })
        .await
    }

    async fn add_friend(&self, owner: &str, friend: &str) -> RemoteResult<()> {
        self.ack(AccountRequest::AddFriend {
            owner: owner.to_string(),
            friend: friend.to_string(),
        })
        .await
    }

    async fn delete_friend(&self, owner: &str, friend: &str) -> RemoteResult<()> {
        self.ack(AccountRequest::DeleteFriend {
            owner: owner.to_string(),
            friend: friend.to_string(),
        })
        .await
    }

    async fn get_top_friend(&self, username: &str) -> RemoteResult<Option<TopFriend>> {
        let request = AccountRequest::GetTopFriend {
            username: username.to_string(),
        };
        match self.call(&request).await? {
            AccountResponse::TopFriend { friend } => Ok(Some(friend)),
            AccountResponse::Empty => Ok(None),
            AccountResponse::Rejected { reason } => Err(RemoteError::Rejected(reason)),
            other => Err(unexpected(other)),
        }
    }

    async fn get_block_seed(&self, username: &str) -> RemoteResult<i64> {
        self.number(AccountRequest::GetBlockSeed {
            username: username.to_string(),
        })
        .await
    }

    async fn set_block_seed(&self, username: &str, seed: i64) -> RemoteResult<()> {
        self.ack(AccountRequest::SetBlockSeed {
            username: username.to_string(),
            seed,
        })
        .await
    }

    async fn get_daily_challenge_seed(&self) -> RemoteResult<i64> {
        self.number(AccountRequest::GetDailyChallengeSeed).await
    }

    async fn get_login_status(&self, username: &str) -> RemoteResult<bool> {
        self.flag(AccountRequest::GetLoginStatus {
            username: username.to_string(),
        })
        .await
    }
}
