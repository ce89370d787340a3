use std::time::Duration;

/// Version reported by the healthcheck endpoint
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 4000;

/// Default SQLite database URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite://parley.db";

/// Lifetime of a bearer token issued by the login endpoint
pub const DEFAULT_AUTH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifetime of the activation token mailed at registration
pub const DEFAULT_ACTIVATION_TOKEN_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Upper bound on any single token-store round trip or password hash
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// Rate limiter defaults
pub const DEFAULT_LIMITER_RPS: f64 = 2.0;
pub const DEFAULT_LIMITER_BURST: u32 = 5;
pub const DEFAULT_LIMITER_RETENTION: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// How often expired token rows are purged
pub const TOKEN_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

// Mail delivery
pub const MAIL_SEND_ATTEMPTS: u32 = 3;
pub const MAIL_RETRY_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAIL_SENDER: &str = "Parley <no-reply@parley.local>";
