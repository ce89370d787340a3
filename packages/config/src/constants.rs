// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Parley

// Server
pub const PARLEY_PORT: &str = "PARLEY_PORT";
pub const PARLEY_ENV: &str = "PARLEY_ENV";
pub const PARLEY_DATABASE_URL: &str = "PARLEY_DATABASE_URL";
pub const PARLEY_REQUEST_TIMEOUT_MS: &str = "PARLEY_REQUEST_TIMEOUT_MS";

// Rate Limiting
pub const PARLEY_LIMITER_ENABLED: &str = "PARLEY_LIMITER_ENABLED";
pub const PARLEY_LIMITER_RPS: &str = "PARLEY_LIMITER_RPS";
pub const PARLEY_LIMITER_BURST: &str = "PARLEY_LIMITER_BURST";
pub const PARLEY_LIMITER_RETENTION_SECS: &str = "PARLEY_LIMITER_RETENTION_SECS";
pub const PARLEY_LIMITER_SWEEP_SECS: &str = "PARLEY_LIMITER_SWEEP_SECS";
pub const PARLEY_LIMITER_KEY: &str = "PARLEY_LIMITER_KEY"; // peer | forwarded

// Tokens
pub const PARLEY_AUTH_TOKEN_TTL_HOURS: &str = "PARLEY_AUTH_TOKEN_TTL_HOURS";
pub const PARLEY_ACTIVATION_TOKEN_TTL_HOURS: &str = "PARLEY_ACTIVATION_TOKEN_TTL_HOURS";

// Mail
pub const PARLEY_MAIL_SENDER: &str = "PARLEY_MAIL_SENDER";

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
