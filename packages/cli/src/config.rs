// ABOUTME: Server configuration loaded from PARLEY_* environment variables
// ABOUTME: Port, database, rate limiter, token lifetimes, timeouts, and mail sender

use std::env;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use parley_config::constants::*;
use parley_core::constants::{
    DEFAULT_ACTIVATION_TOKEN_TTL, DEFAULT_AUTH_TOKEN_TTL, DEFAULT_DATABASE_URL,
    DEFAULT_LIMITER_BURST, DEFAULT_LIMITER_RETENTION, DEFAULT_LIMITER_RPS,
    DEFAULT_LIMITER_SWEEP_INTERVAL, DEFAULT_MAIL_SENDER, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),
    #[error("Invalid rate limiter key source: {0}")]
    InvalidKeySource(String),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

/// Where the rate limiter reads the client key from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKeySource {
    /// The TCP peer address
    Peer,
    /// First `X-Forwarded-For` entry, falling back to the peer address
    Forwarded,
}

impl FromStr for RateLimitKeySource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "peer" => Ok(RateLimitKeySource::Peer),
            "forwarded" => Ok(RateLimitKeySource::Forwarded),
            _ => Err(ConfigError::InvalidKeySource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub rps: f64,
    pub burst: u32,
    /// Entries idle for longer than this are evicted by the sweep
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub key_source: RateLimitKeySource,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: DEFAULT_LIMITER_RPS,
            burst: DEFAULT_LIMITER_BURST,
            retention: DEFAULT_LIMITER_RETENTION,
            sweep_interval: DEFAULT_LIMITER_SWEEP_INTERVAL,
            key_source: RateLimitKeySource::Peer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub database_url: String,
    pub limiter: RateLimitConfig,
    pub auth_token_ttl: Duration,
    pub activation_token_ttl: Duration,
    /// Deadline for each token-store call and password hash
    pub request_timeout: Duration,
    pub mail_sender: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::Development,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            limiter: RateLimitConfig::default(),
            auth_token_ttl: DEFAULT_AUTH_TOKEN_TTL,
            activation_token_ttl: DEFAULT_ACTIVATION_TOKEN_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            mail_sender: DEFAULT_MAIL_SENDER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let port = match lookup(PARLEY_PORT) {
            Some(raw) => raw.trim().parse::<u16>()?,
            None => defaults.port,
        };
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let environment = match lookup(PARLEY_ENV) {
            Some(raw) => raw.parse()?,
            None => defaults.environment,
        };

        let database_url = lookup(PARLEY_DATABASE_URL)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.database_url);

        let limiter = RateLimitConfig {
            enabled: parse_or(&lookup, PARLEY_LIMITER_ENABLED, defaults.limiter.enabled)?,
            rps: parse_or(&lookup, PARLEY_LIMITER_RPS, defaults.limiter.rps)?,
            burst: parse_or(&lookup, PARLEY_LIMITER_BURST, defaults.limiter.burst)?,
            retention: seconds_or(&lookup, PARLEY_LIMITER_RETENTION_SECS, defaults.limiter.retention)?,
            sweep_interval: seconds_or(
                &lookup,
                PARLEY_LIMITER_SWEEP_SECS,
                defaults.limiter.sweep_interval,
            )?,
            key_source: match lookup(PARLEY_LIMITER_KEY) {
                Some(raw) => raw.parse()?,
                None => defaults.limiter.key_source,
            },
        };
        if !limiter.rps.is_finite() || limiter.rps <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: PARLEY_LIMITER_RPS,
                value: limiter.rps.to_string(),
            });
        }
        if limiter.burst == 0 {
            return Err(ConfigError::InvalidValue {
                key: PARLEY_LIMITER_BURST,
                value: "0".to_string(),
            });
        }

        let auth_token_ttl = hours_or(&lookup, PARLEY_AUTH_TOKEN_TTL_HOURS, defaults.auth_token_ttl)?;
        let activation_token_ttl = hours_or(
            &lookup,
            PARLEY_ACTIVATION_TOKEN_TTL_HOURS,
            defaults.activation_token_ttl,
        )?;

        let request_timeout = match lookup(PARLEY_REQUEST_TIMEOUT_MS) {
            Some(raw) => Duration::from_millis(positive(PARLEY_REQUEST_TIMEOUT_MS, &raw)?),
            None => defaults.request_timeout,
        };

        let mail_sender = lookup(PARLEY_MAIL_SENDER)
            .filter(|sender| !sender.trim().is_empty())
            .unwrap_or(defaults.mail_sender);

        Ok(Config {
            port,
            environment,
            database_url,
            limiter,
            auth_token_ttl,
            activation_token_ttl,
            request_timeout,
            mail_sender,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw.clone(),
        }),
        None => Ok(default),
    }
}

fn positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn seconds_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => Ok(Duration::from_secs(positive(key, &raw)?)),
        None => Ok(default),
    }
}

fn hours_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => Ok(Duration::from_secs(
            positive(key, &raw)?.saturating_mul(60 * 60),
        )),
        None => Ok(default),
    }
}
