// ABOUTME: Security, authentication, and credential handling for Parley
// ABOUTME: Password and token hashing, bearer token issuance, and caller identity

pub mod credentials;
pub mod identity;
pub mod tokens;

// Re-export main types for convenience
pub use credentials::{
    generate_token, hash_password, hash_password_bounded, hash_token, verify_password,
    verify_password_bounded, verify_token_hash, CredentialError,
};
pub use identity::{CallerIdentity, UserIdentity};
pub use tokens::{Scope, TokenError, TokenGeneration, TokenIssuer};
