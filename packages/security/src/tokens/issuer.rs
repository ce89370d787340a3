// ABOUTME: Issues and authenticates opaque bearer tokens
// ABOUTME: Plaintexts are returned once; only SHA-256 hashes are persisted

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::SubsecRound;
use parley_core::Clock;
use parley_storage::{StorageError, TokenRecord, TokenStore, UserStore};
use tracing::{debug, info, warn};

use super::types::{Scope, TokenError, TokenGeneration};
use crate::credentials::{generate_token, hash_token, verify_token_hash};
use crate::identity::UserIdentity;

/// Owns the token lifecycle on top of a `TokenStore`.
///
/// Every store call is bounded by `timeout`; an expired deadline surfaces as
/// `TokenError::Timeout` and the in-flight call is dropped.
#[derive(Clone)]
pub struct TokenIssuer {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl TokenIssuer {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            users,
            clock,
            timeout,
        }
    }

    /// Mint a token for `user_id` valid for `ttl`.
    ///
    /// The record is written before the plaintext is handed back, so a
    /// returned token is always usable. If the write times out the plaintext
    /// is discarded and any row that did land is deleted in the background,
    /// best effort.
    pub async fn issue(
        &self,
        user_id: i64,
        scope: Scope,
        ttl: Duration,
    ) -> Result<TokenGeneration, TokenError> {
        if ttl.is_zero() {
            return Err(TokenError::TtlOutOfRange);
        }
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| TokenError::TtlOutOfRange)?;
        let expiry = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(TokenError::TtlOutOfRange)?
            // The store keeps millisecond precision
            .trunc_subsecs(3);

        let token = generate_token();
        let record = TokenRecord {
            hash: hash_token(&token),
            user_id,
            expiry,
            scope: scope.as_str().to_string(),
        };

        match self.bounded(self.tokens.insert(&record)).await {
            Ok(()) => {}
            Err(TokenError::Timeout(timeout)) => {
                self.discard_in_background(record.hash);
                return Err(TokenError::Timeout(timeout));
            }
            Err(e) => return Err(e),
        }
        debug!(user_id, %scope, %expiry, "Issued token");

        Ok(TokenGeneration {
            token,
            expiry,
            scope,
        })
    }

    /// Resolve a presented plaintext to the identity of its owner.
    ///
    /// Unknown, expired, wrong-scope, and orphaned tokens all yield the same
    /// `TokenError::Invalid`.
    pub async fn authenticate(
        &self,
        plaintext: &str,
        scope: Scope,
    ) -> Result<UserIdentity, TokenError> {
        if plaintext.is_empty() {
            return Err(TokenError::Invalid);
        }

        let hash = hash_token(plaintext);
        let record = self
            .bounded(self.tokens.find_by_hash(&hash))
            .await?
            .ok_or(TokenError::Invalid)?;

        let scope_matches = record.scope == scope.as_str();
        let unexpired = record.expiry > self.clock.now();
        let hash_matches = verify_token_hash(plaintext, &record.hash);
        if !(scope_matches && unexpired && hash_matches) {
            return Err(TokenError::Invalid);
        }

        let user = self
            .bounded(self.users.get_by_id(record.user_id))
            .await?
            .ok_or(TokenError::Invalid)?;

        Ok(UserIdentity {
            user_id: user.id,
            is_activated: user.activated,
        })
    }

    /// Delete every `scope` token owned by `user_id`.
    pub async fn revoke_all(&self, user_id: i64, scope: Scope) -> Result<u64, TokenError> {
        let removed = self
            .bounded(self.tokens.delete_all_for_user(user_id, scope.as_str()))
            .await?;

        info!(user_id, %scope, removed, "Revoked tokens");
        Ok(removed)
    }

    /// Delete every token whose expiry has passed.
    pub async fn purge_expired(&self) -> Result<u64, TokenError> {
        let now = self.clock.now();
        let removed = self.bounded(self.tokens.delete_expired(now)).await?;

        if removed > 0 {
            info!(removed, "Purged expired tokens");
        }
        Ok(removed)
    }

    /// Delete a record whose insert outlived its deadline.
    fn discard_in_background(&self, hash: String) {
        let tokens = Arc::clone(&self.tokens);
        let timeout = self.timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, tokens.delete_by_hash(&hash)).await {
                Ok(Ok(removed)) if removed > 0 => {
                    debug!("Removed token record left by a timed-out issue");
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "Failed to remove abandoned token record"),
                Err(_) => warn!(timeout = ?timeout, "Abandoned token cleanup timed out"),
            }
        });
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, TokenError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(TokenError::from),
            Err(_) => {
                warn!(timeout = ?self.timeout, "Token store call timed out");
                Err(TokenError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("clock", &self.clock)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
