// ABOUTME: User storage layer using SQLite
// ABOUTME: Registration inserts, lookups by email and id, and versioned updates

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::StorageError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub activated: bool,
    #[serde(skip)]
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new, not-yet-activated user. Fails with `DuplicateEmail`.
    async fn insert(&self, user: &NewUser) -> Result<User, StorageError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Persist `user` if its version is still current. Fails with `EditConflict`.
    async fn update(&self, user: &User) -> Result<User, StorageError>;
}

pub struct UserStorage {
    pool: SqlitePool,
}

impl UserStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, created_at, name, email, password_hash, activated, version";

fn map_unique_violation(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StorageError::DuplicateEmail
        }
        _ => StorageError::Sqlx(err),
    }
}

#[async_trait]
impl UserStore for UserStorage {
    async fn insert(&self, user: &NewUser) -> Result<User, StorageError> {
        let query = format!(
            "INSERT INTO users (created_at, name, email, password_hash, activated, version)
             VALUES (?, ?, ?, ?, 0, 1)
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(Utc::now())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)?;

        debug!(user_id = user.id, "User created");
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, StorageError> {
        debug!(user_id = user.id, "Updating user");

        let query = format!(
            "UPDATE users
             SET name = ?, email = ?, password_hash = ?, activated = ?, version = version + 1
             WHERE id = ? AND version = ?
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.activated)
            .bind(user.id)
            .bind(user.version)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?
            .ok_or(StorageError::EditConflict)
    }
}
