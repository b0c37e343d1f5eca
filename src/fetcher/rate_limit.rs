//! Per-host token buckets.
//!
//! One bucket per rate-limit key, shared across every concurrent task in the
//! process. Capacity is a single token, so over any 1 s window a host sees at
//! most `rate + 1` dispatches (one burst token plus refill).

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct HostRateLimiter {
    buckets: DashMap<String, Arc<Mutex<TokenBucket>>>,
}

impl HostRateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Take one token from the bucket for `key`, suspending until one is
    /// available. Refill rate is tokens/sec. Returns `Cancelled` if the pass
    /// is cancelled while waiting; no token is consumed in that case.
    pub async fn acquire(
        &self,
        key: &str,
        rate: f64,
        cancel: &CancellationToken,
    ) -> Result<(), FetchError> {
        let rate = rate.max(0.1);
        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(TokenBucket {
                    tokens: 1.0,
                    last_refill: Instant::now(),
                }))
            })
            .clone();

        loop {
            let wait = {
                let mut b = bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(b.last_refill).as_secs_f64();
                b.tokens = (b.tokens + elapsed * rate).min(1.0);
                b.last_refill = now;

                if b.tokens >= 1.0 {
                    b.tokens -= 1.0;
                    return Ok(());
                }
                Duration::from_secs_f64((1.0 - b.tokens) / rate)
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            }
        }
    }
}

impl Default for HostRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
