// ABOUTME: Comment storage layer using SQLite
// ABOUTME: CRUD with optimistic versioning and filtered, paginated listing

use chrono::{DateTime, Utc};
use parley_core::validation::Validator;
use serde::Serialize;
use sqlx::{FromRow, Row, SqlitePool};
use tracing::debug;

use crate::pagination::{Filters, Metadata};
use crate::StorageError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub author: String,
    pub version: i64,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub author: String,
}

/// Field rules shared by create and update.
pub fn validate_comment(v: &mut Validator, content: &str, author: &str) {
    v.check(!content.is_empty(), "content", "must be provided");
    v.check(
        content.len() <= 100,
        "content",
        "must not be more than 100 bytes long",
    );
    v.check(!author.is_empty(), "author", "must be provided");
    v.check(
        author.len() <= 25,
        "author",
        "must not be more than 25 bytes long",
    );
}

const COMMENT_COLUMNS: &str = "id, created_at, content, author, version";

pub struct CommentStorage {
    pool: SqlitePool,
}

impl CommentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, comment: &NewComment) -> Result<Comment, StorageError> {
        let query = format!(
            "INSERT INTO comments (created_at, content, author, version)
             VALUES (?, ?, ?, 1)
             RETURNING {COMMENT_COLUMNS}"
        );

        let comment = sqlx::query_as::<_, Comment>(&query)
            .bind(Utc::now())
            .bind(&comment.content)
            .bind(&comment.author)
            .fetch_one(&self.pool)
            .await?;

        debug!(comment_id = comment.id, "Comment created");
        Ok(comment)
    }

    pub async fn get(&self, id: i64) -> Result<Comment, StorageError> {
        if id < 1 {
            return Err(StorageError::NotFound);
        }

        let query = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");

        sqlx::query_as::<_, Comment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::NotFound)
    }

    /// Write `comment` back if nobody else changed it since it was read.
    pub async fn update(&self, comment: &Comment) -> Result<Comment, StorageError> {
        let query = format!(
            "UPDATE comments
             SET content = ?, author = ?, version = version + 1
             WHERE id = ? AND version = ?
             RETURNING {COMMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Comment>(&query)
            .bind(&comment.content)
            .bind(&comment.author)
            .bind(comment.id)
            .bind(comment.version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StorageError::EditConflict)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StorageError> {
        if id < 1 {
            return Err(StorageError::NotFound);
        }

        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// List comments whose content and author contain the given substrings
    /// (empty means "any"), sorted and paginated by `filters`.
    pub async fn list(
        &self,
        content: &str,
        author: &str,
        filters: &Filters,
    ) -> Result<(Vec<Comment>, Metadata), StorageError> {
        // sort_column() only ever returns a safe-listed column name
        let query = format!(
            "SELECT COUNT(*) OVER() AS total_records, {COMMENT_COLUMNS}
             FROM comments
             WHERE (? = '' OR instr(lower(content), lower(?)) > 0)
               AND (? = '' OR instr(lower(author), lower(?)) > 0)
             ORDER BY {} {}, id ASC
             LIMIT ? OFFSET ?",
            filters.sort_column(),
            filters.sort_direction()
        );

        let rows = sqlx::query(&query)
            .bind(content)
            .bind(content)
            .bind(author)
            .bind(author)
            .bind(filters.limit())
            .bind(filters.offset())
            .fetch_all(&self.pool)
            .await?;

        let mut total_records = 0;
        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            total_records = row.try_get("total_records")?;
            comments.push(Comment::from_row(&row)?);
        }

        let metadata = Metadata::calculate(total_records, filters.page, filters.page_size);
        Ok((comments, metadata))
    }
}
