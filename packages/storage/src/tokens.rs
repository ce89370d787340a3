// ABOUTME: Storage operations for bearer token records
// ABOUTME: Only token hashes are persisted; plaintexts never reach this layer

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::StorageError;

/// A persisted token. `expiry` is stored as unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub hash: String,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: String,
}

/// Row-level access to token records.
///
/// Every method is a single statement, so concurrent issuance and lookup for
/// the same owner are serialized by the database.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, record: &TokenRecord) -> Result<(), StorageError>;

    async fn find_by_hash(&self, hash: &str) -> Result<Option<TokenRecord>, StorageError>;

    /// Delete the token with `hash`. Returns rows removed.
    async fn delete_by_hash(&self, hash: &str) -> Result<u64, StorageError>;

    /// Delete every token owned by `user_id` with `scope`. Returns rows removed.
    async fn delete_all_for_user(&self, user_id: i64, scope: &str) -> Result<u64, StorageError>;

    /// Delete tokens whose expiry is at or before `now`. Returns rows removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;
}

pub struct TokenStorage {
    pool: SqlitePool,
}

impl TokenStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<TokenRecord, StorageError> {
        let expiry_ms: i64 = row.try_get("expiry")?;
        let expiry = DateTime::from_timestamp_millis(expiry_ms)
            .ok_or_else(|| StorageError::InvalidData(format!("token expiry {expiry_ms}")))?;

        Ok(TokenRecord {
            hash: row.try_get("hash")?,
            user_id: row.try_get("user_id")?,
            expiry,
            scope: row.try_get("scope")?,
        })
    }
}

#[async_trait]
impl TokenStore for TokenStorage {
    async fn insert(&self, record: &TokenRecord) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES (?, ?, ?, ?)")
            .bind(&record.hash)
            .bind(record.user_id)
            .bind(record.expiry.timestamp_millis())
            .bind(&record.scope)
            .execute(&self.pool)
            .await?;

        debug!(user_id = record.user_id, scope = %record.scope, "Token record stored");
        Ok(())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<TokenRecord>, StorageError> {
        let row = sqlx::query("SELECT hash, user_id, expiry, scope FROM tokens WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn delete_by_hash(&self, hash: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM tokens WHERE hash = ?")
            .bind(hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_all_for_user(&self, user_id: i64, scope: &str) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = ? AND scope = ?")
            .bind(user_id)
            .bind(scope)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM tokens WHERE expiry <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
