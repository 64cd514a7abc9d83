//! Fixed-window request rate limiting.
//!
//! One limiter instance is owned by the process and handed to request
//! handlers; there is no module-level state. Counters live in a
//! mutex-guarded table so concurrent increment-and-check is atomic per
//! call. Windows are fixed, not sliding, which is an accepted
//! approximation for this scope.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde_json::json;

use super::error::Error;

/// Request class a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateBucket {
    /// Authentication endpoints (magic-link sends, session churn).
    Auth,
    /// Read-only endpoints.
    Read,
    /// Mutating endpoints.
    Write,
}

impl RateBucket {
    /// Stable name used in counter keys and error details.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Limit for one bucket: at most `max` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketConfig {
    pub max: u32,
    pub window: Duration,
}

/// Per-bucket limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    pub auth: BucketConfig,
    pub read: BucketConfig,
    pub write: BucketConfig,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            auth: BucketConfig {
                max: 10,
                window: Duration::from_secs(15 * 60),
            },
            read: BucketConfig {
                max: 100,
                window: Duration::from_secs(60),
            },
            write: BucketConfig {
                max: 30,
                window: Duration::from_secs(60),
            },
        }
    }
}

impl RateLimiterConfig {
    /// Stock limits with the read bucket overridden from the environment
    /// (`RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_MS`), ignoring unparsable or
    /// non-positive values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max) = read_positive_env("RATE_LIMIT_MAX") {
            config.read.max = max;
        }
        if let Some(window_ms) = read_positive_env("RATE_LIMIT_WINDOW_MS") {
            config.read.window = Duration::from_millis(u64::from(window_ms));
        }
        config
    }

    const fn bucket(&self, bucket: RateBucket) -> BucketConfig {
        match bucket {
            RateBucket::Auth => self.auth,
            RateBucket::Read => self.read,
            RateBucket::Write => self.write,
        }
    }
}

fn read_positive_env(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
}

/// Table size above which expired counters are pruned on the next check.
const PRUNE_THRESHOLD: usize = 2048;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Fixed-window limiter keyed by (bucket, client identifier).
pub struct RateLimiter {
    config: RateLimiterConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl RateLimiter {
    /// Create a limiter with the given limits and clock.
    pub fn new(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request and decide whether it may proceed.
    ///
    /// Rejections carry the remaining window time as a retry-after hint.
    pub fn check(&self, bucket: RateBucket, client: &str) -> Result<(), Error> {
        let now = self.clock.utc();
        let config = self.config.bucket(bucket);
        let key = format!("{}:{client}", bucket.as_str());

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::internal("rate limiter state poisoned"))?;
        if entries.len() >= PRUNE_THRESHOLD {
            entries.retain(|_, entry| entry.reset_at > now);
        }

        match entries.get_mut(&key) {
            Some(entry) if entry.reset_at > now => {
                if entry.count >= config.max {
                    let remaining = (entry.reset_at - now).to_std().unwrap_or(Duration::ZERO);
                    return Err(Error::rate_limited("Rate limit exceeded", remaining)
                        .with_details(json!({ "bucket": bucket.as_str() })));
                }
                entry.count += 1;
                Ok(())
            }
            _ => {
                let reset_at = now
                    + TimeDelta::from_std(config.window)
                        .unwrap_or_else(|_| TimeDelta::seconds(60));
                entries.insert(key, WindowEntry { count: 1, reset_at });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::test_support::MutableClock;
    use rstest::rstest;

    fn limiter(clock: Arc<MutableClock>) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig::default(), clock)
    }

    #[rstest]
    fn auth_bucket_allows_ten_then_rejects_the_eleventh() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let limiter = limiter(clock);

        for _ in 0..10 {
            limiter.check(RateBucket::Auth, "10.0.0.1").expect("allowed");
        }
        let error = limiter
            .check(RateBucket::Auth, "10.0.0.1")
            .expect_err("11th request rejected");
        assert_eq!(error.code(), ErrorCode::RateLimited);
        let retry_after = error.retry_after().expect("retry hint");
        assert!(retry_after <= Duration::from_secs(15 * 60));
        assert!(retry_after > Duration::ZERO);
    }

    #[rstest]
    fn window_elapse_resets_the_counter() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let limiter = limiter(clock.clone());

        for _ in 0..30 {
            limiter.check(RateBucket::Write, "10.0.0.1").expect("allowed");
        }
        limiter
            .check(RateBucket::Write, "10.0.0.1")
            .expect_err("over limit");

        clock.advance(Duration::from_secs(61));
        limiter
            .check(RateBucket::Write, "10.0.0.1")
            .expect("fresh window");
    }

    #[rstest]
    fn buckets_and_clients_are_counted_independently() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let limiter = limiter(clock);

        for _ in 0..10 {
            limiter.check(RateBucket::Auth, "10.0.0.1").expect("allowed");
        }
        limiter.check(RateBucket::Auth, "10.0.0.2").expect("other client");
        limiter.check(RateBucket::Read, "10.0.0.1").expect("other bucket");
    }

    #[rstest]
    fn expired_entries_are_pruned_once_the_table_grows() {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let limiter = limiter(clock.clone());

        for index in 0..PRUNE_THRESHOLD {
            limiter
                .check(RateBucket::Read, &format!("client-{index}"))
                .expect("allowed");
        }
        clock.advance(Duration::from_secs(61));
        limiter.check(RateBucket::Read, "fresh").expect("allowed");

        let entries = limiter.entries.lock().expect("lock");
        assert_eq!(entries.len(), 1);
    }
}
