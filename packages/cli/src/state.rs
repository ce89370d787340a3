// ABOUTME: Shared application state handed to handlers and middleware
// ABOUTME: Wires storage, token issuer, rate limiter, and mail dispatch together

use std::future::Future;
use std::sync::Arc;

use parley_core::{Clock, SystemClock};
use parley_security::TokenIssuer;
use parley_storage::{CommentStorage, StorageError, TokenStorage, UserStorage, UserStore};
use sqlx::SqlitePool;
use tracing::warn;

use crate::config::Config;
use crate::error::AppError;
use crate::mailer::{MailDispatcher, Mailer};
use crate::middleware::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub issuer: TokenIssuer,
    pub users: Arc<dyn UserStore>,
    pub comments: Arc<CommentStorage>,
    pub mailer: MailDispatcher,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self::with_clock(config, pool, mailer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        pool: SqlitePool,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let users: Arc<dyn UserStore> = Arc::new(UserStorage::new(pool.clone()));
        let issuer = TokenIssuer::new(
            Arc::new(TokenStorage::new(pool.clone())),
            users.clone(),
            clock,
            config.request_timeout,
        );

        Self {
            issuer,
            users,
            comments: Arc::new(CommentStorage::new(pool)),
            mailer: MailDispatcher::new(mailer, config.mail_sender.clone()),
            limiter: RateLimiter::new(config.limiter.clone()),
            config: Arc::new(config),
        }
    }

    /// Run a user-store call under `request_timeout`. An expired deadline is
    /// an internal error.
    pub async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, AppError> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(timeout = ?timeout, "User store call timed out");
                Err(AppError::internal(anyhow::anyhow!(
                    "user store did not respond within {timeout:?}"
                )))
            }
        }
    }
}
