use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{RateLimitConfig, RateLimitKeySource};
use crate::error::AppError;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Token bucket state for one client
#[derive(Debug, Clone)]
struct ClientEntry {
    available: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl ClientEntry {
    fn full(burst: u32, now: Instant) -> Self {
        Self {
            available: f64::from(burst),
            last_refill: now,
            last_seen: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Per-client token bucket limiter.
///
/// Buckets live in a sharded map; a check holds only the shard lock of its
/// own key, so clients on different shards never contend.
#[derive(Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    clients: Arc<DashMap<String, ClientEntry>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            clients: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Number of clients currently holding a bucket
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Refill the client's bucket up to `now`, then try to take one token.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        if !self.config.enabled {
            return RateLimitDecision::Allowed {
                remaining: self.config.burst,
            };
        }

        let burst = f64::from(self.config.burst);
        let rps = self.config.rps;

        let mut entry = self
            .clients
            .entry(key.to_string())
            .or_insert_with(|| ClientEntry::full(self.config.burst, now));

        // Instants from concurrent callers may arrive out of order
        let elapsed = now.saturating_duration_since(entry.last_refill);
        entry.available = (entry.available + elapsed.as_secs_f64() * rps).min(burst);
        entry.last_refill = entry.last_refill.max(now);
        entry.last_seen = entry.last_seen.max(now);

        if entry.available >= 1.0 {
            entry.available -= 1.0;
            RateLimitDecision::Allowed {
                remaining: entry.available.floor() as u32,
            }
        } else {
            let wait = (1.0 - entry.available) / rps;
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs_f64(wait),
            }
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Drop every client idle for longer than the retention window.
    /// Returns the number of entries removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let retention = self.config.retention;
        let mut removed = 0;

        self.clients.retain(|_, entry| {
            let keep = now.saturating_duration_since(entry.last_seen) <= retention;
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    /// Run `sweep` every `sweep_interval` until the handle is aborted.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.clone();
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    debug!(
                        removed,
                        remaining = limiter.tracked_clients(),
                        "Swept idle rate limiter entries"
                    );
                }
            }
        })
    }
}

/// Derive the key a request is limited under.
pub fn client_key(request: &Request, source: RateLimitKeySource) -> String {
    if source == RateLimitKeySource::Forwarded {
        let forwarded = request
            .headers()
            .get(&X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Per-client rate limiting middleware
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !limiter.config().enabled {
        return Ok(next.run(request).await);
    }

    let key = client_key(&request, limiter.config().key_source);

    match limiter.check(&key) {
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limiter.config().burst));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            Ok(response)
        }
        RateLimitDecision::Limited { retry_after } => {
            warn!(
                client = %key,
                path = %request.uri().path(),
                audit = true,
                "Rate limit exceeded"
            );

            // Whole seconds, never zero
            let retry_after = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            Err(AppError::rate_limited(retry_after))
        }
    }
}
