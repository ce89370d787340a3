// ABOUTME: Data layer and persistence for Parley
// ABOUTME: SQLite pool setup plus token, user, and comment storage

pub mod comments;
pub mod db;
pub mod pagination;
pub mod tokens;
pub mod users;

use thiserror::Error;

pub use comments::{validate_comment, Comment, CommentStorage, NewComment};
pub use db::{connect, connect_in_memory, init_schema};
pub use pagination::{Filters, Metadata};
pub use tokens::{TokenRecord, TokenStorage, TokenStore};
pub use users::{NewUser, User, UserStorage, UserStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate email address")]
    DuplicateEmail,

    #[error("Edit conflict: record was modified concurrently")]
    EditConflict,

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}
