// ABOUTME: Bearer token lifecycle management
// ABOUTME: Issuance, authentication, revocation, and expiry purges of scoped tokens

mod issuer;
mod types;

pub use issuer::TokenIssuer;
pub use types::{Scope, TokenError, TokenGeneration};
