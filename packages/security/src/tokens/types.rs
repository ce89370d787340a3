// ABOUTME: Type definitions for bearer token authentication
// ABOUTME: Token scopes, the one-time issuance result, and lifecycle errors

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parley_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// What a token may be used for. A token only authenticates for its own scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Authentication,
    Activation,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Authentication => "authentication",
            Scope::Activation => "activation",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authentication" => Ok(Scope::Authentication),
            "activation" => Ok(Scope::Activation),
            _ => Err(TokenError::Invalid),
        }
    }
}

/// Token issuance result - includes the plaintext token
/// This is the ONLY time the plaintext token is available
#[derive(Clone, Serialize)]
pub struct TokenGeneration {
    pub token: String,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: Scope,
}

impl fmt::Debug for TokenGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGeneration")
            .field("token", &"<redacted>")
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Unknown, expired, wrong-scope, or orphaned token. Deliberately uniform.
    #[error("Invalid or expired token")]
    Invalid,

    #[error("Token TTL is out of range")]
    TtlOutOfRange,

    #[error("Token store did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),
}
