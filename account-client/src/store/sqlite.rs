//! SQLite implementation of the local store.
//!
//! Uses WAL mode for concurrent reads/writes. Credentials are stored as
//! opaque strings; hashing is the account service's concern, not this
//! layer's.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use account_types::StoreError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{LocalStore, StoreResult};

/// SQLite-backed on-device account store.
#[derive(Clone)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Open (or create) the database at the given path.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(path.to_str().unwrap_or("account.db"))
            .map_err(db_err)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(db_err)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                username TEXT PRIMARY KEY,
                password TEXT NOT NULL,
                token TEXT,
                high_score INTEGER NOT NULL DEFAULT 0,
                logged_in INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS friends (
                owner TEXT NOT NULL,
                friend TEXT NOT NULL,
                PRIMARY KEY (owner, friend)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_friends_owner ON friends(owner)")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Map an insert error, turning unique-key violations into rejections.
fn insert_err(err: sqlx::Error, reason: String) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Rejected(reason);
        }
    }
    db_err(err)
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn add_user(&self, username: &str, password: &str) -> StoreResult<()> {
        sqlx::query("INSERT INTO accounts (username, password) VALUES (?1, ?2)")
            .bind(username)
            .bind(password)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_err(e, format!("username '{username}' already exists")))?;
        Ok(())
    }

    async fn delete_user(&self, username: &str, password: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE username = ?1 AND password = ?2")
            .bind(username)
            .bind(password)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!(
                "no account '{username}' with that credential"
            )));
        }
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> StoreResult<()> {
        // One logged-in user per device.
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("UPDATE accounts SET logged_in = 0")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let result =
            sqlx::query("UPDATE accounts SET logged_in = 1 WHERE username = ?1 AND password = ?2")
                .bind(username)
                .bind(password)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            // Roll back so a failed login does not log everyone out.
            tx.rollback().await.map_err(db_err)?;
            return Err(StoreError::Rejected(format!(
                "bad credential for '{username}'"
            )));
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn logout(&self, username: &str) -> StoreResult<()> {
        sqlx::query("UPDATE accounts SET logged_in = 0 WHERE username = ?1")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_high_score(&self, username: &str, score: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET high_score = ?2 WHERE username = ?1")
            .bind(username)
            .bind(score)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!("no such user '{username}'")));
        }
        Ok(())
    }

    async fn get_high_score(&self, username: &str) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT high_score FROM accounts WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::Rejected(format!("no such user '{username}'")))
    }

    async fn add_friend(&self, owner: &str, friend: &str) -> StoreResult<()> {
        sqlx::query("INSERT INTO friends (owner, friend) VALUES (?1, ?2)")
            .bind(owner)
            .bind(friend)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_err(e, format!("'{owner}' already has friend '{friend}'")))?;
        Ok(())
    }

    async fn delete_friend(&self, owner: &str, friend: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM friends WHERE owner = ?1 AND friend = ?2")
            .bind(owner)
            .bind(friend)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!(
                "'{owner}' has no friend '{friend}'"
            )));
        }
        Ok(())
    }

    async fn friends_list(&self, username: &str) -> StoreResult<Vec<String>> {
        sqlx::query_scalar("SELECT friend FROM friends WHERE owner = ?1 ORDER BY friend")
            .bind(username)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn set_token(&self, username: &str, token: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE accounts SET token = ?2 WHERE username = ?1")
            .bind(username)
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!("no such user '{username}'")));
        }
        Ok(())
    }

    async fn token(&self, username: &str) -> StoreResult<Option<String>> {
        let token: Option<Option<String>> =
            sqlx::query_scalar("SELECT token FROM accounts WHERE username = ?1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        match token {
            Some(token) => Ok(token),
            None => Err(StoreError::Rejected(format!("no such user '{username}'"))),
        }
    }

    async fn logged_in_user(&self) -> StoreResult<Option<String>> {
        sqlx::query_scalar("SELECT username FROM accounts WHERE logged_in = 1 LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_login_delete_cycle() {
        let store = SqliteLocalStore::in_memory().await.unwrap();

        store.add_user("deadbeef", "wachtwoord").await.unwrap();
        store.login("deadbeef", "wachtwoord").await.unwrap();
        assert_eq!(
            store.logged_in_user().await.unwrap(),
            Some("deadbeef".to_string())
        );

        store.delete_user("deadbeef", "wachtwoord").await.unwrap();
        let result = store.login("deadbeef", "wachtwoord").await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_user("deadbeef", "a").await.unwrap();

        let result = store.add_user("deadbeef", "b").await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn delete_requires_matching_credential() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_user("deadbeef", "wachtwoord").await.unwrap();

        let result = store.delete_user("deadbeef", "hunter2").await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));

        // Account untouched.
        store.login("deadbeef", "wachtwoord").await.unwrap();
    }

    #[tokio::test]
    async fn login_replaces_previous_session() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_user("deadbeef", "a").await.unwrap();
        store.add_user("prancingCow", "b").await.unwrap();

        store.login("deadbeef", "a").await.unwrap();
        store.login("prancingCow", "b").await.unwrap();

        assert_eq!(
            store.logged_in_user().await.unwrap(),
            Some("prancingCow".to_string())
        );
    }

    #[tokio::test]
    async fn failed_login_keeps_current_session() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_user("deadbeef", "a").await.unwrap();
        store.login("deadbeef", "a").await.unwrap();

        let result = store.login("prancingCow", "nope").await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert_eq!(
            store.logged_in_user().await.unwrap(),
            Some("deadbeef".to_string())
        );
    }

    #[tokio::test]
    async fn high_score_defaults_to_zero() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_user("deadbeef", "a").await.unwrap();

        assert_eq!(store.get_high_score("deadbeef").await.unwrap(), 0);
        store.set_high_score("deadbeef", 1500).await.unwrap();
        assert_eq!(store.get_high_score("deadbeef").await.unwrap(), 1500);
    }

    #[tokio::test]
    async fn friend_edges_are_directed() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_friend("deadbeef", "prancingCow").await.unwrap();
        store.add_friend("deadbeef", "NommingNomer").await.unwrap();

        assert_eq!(
            store.friends_list("deadbeef").await.unwrap(),
            vec!["NommingNomer".to_string(), "prancingCow".to_string()]
        );
        assert!(store.friends_list("prancingCow").await.unwrap().is_empty());

        store
            .delete_friend("deadbeef", "prancingCow")
            .await
            .unwrap();
        assert_eq!(
            store.friends_list("deadbeef").await.unwrap(),
            vec!["NommingNomer".to_string()]
        );
    }

    #[tokio::test]
    async fn deleting_missing_friend_is_rejected() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        let result = store.delete_friend("deadbeef", "prancingCow").await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn token_round_trip() {
        let store = SqliteLocalStore::in_memory().await.unwrap();
        store.add_user("deadbeef", "a").await.unwrap();

        assert_eq!(store.token("deadbeef").await.unwrap(), None);
        store.set_token("deadbeef", "tok-123").await.unwrap();
        assert_eq!(
            store.token("deadbeef").await.unwrap(),
            Some("tok-123".to_string())
        );
    }

    #[tokio::test]
    async fn opens_on_disk_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("account.db");

        let store = SqliteLocalStore::open(&path).await.unwrap();
        store.add_user("deadbeef", "wachtwoord").await.unwrap();
        drop(store);

        // Reopen and find the data still there.
        let store = SqliteLocalStore::open(&path).await.unwrap();
        store.login("deadbeef", "wachtwoord").await.unwrap();
    }
}
