//! Rate-limited, retrying wrapper around any [`DataPort`].
//!
//! Every request first takes a token from a shared bucket, so the limit holds
//! across all screener workers. Retrieval failures are retried with
//! exponential backoff; anything else is returned untouched.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::DailyBar;
use crate::domain::universe::Listing;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    /// Sustained request rate; 0 (the default) disables throttling.
    pub requests_per_second: f64,
    /// Requests allowed back to back before the rate applies.
    pub burst: u32,
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further attempt.
    pub backoff_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 0.0,
            burst: 1,
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    /// Negative while callers are queued for future tokens.
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by all callers.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    rate: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            rate: requests_per_second.max(0.0),
            capacity,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.rate > 0.0
    }

    /// Take a token and return how long the caller must wait before using it.
    fn reserve(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
        bucket.last_refill = now;

        bucket.tokens -= 1.0;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.rate)
        }
    }

    /// Block until a request may be sent.
    pub fn acquire(&self) {
        let wait = self.reserve();
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}

pub struct ThrottledDataPort<P> {
    inner: P,
    limiter: RateLimiter,
    max_retries: u32,
    backoff: Duration,
}

impl<P: DataPort> ThrottledDataPort<P> {
    pub fn new(inner: P, config: &ThrottleConfig) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(config.requests_per_second, config.burst),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn with_retry<T>(
        &self,
        code: &str,
        market: &str,
        mut request: impl FnMut() -> Result<T, ScreenerError>,
    ) -> Result<T, ScreenerError> {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire();
            match request() {
                Err(err @ ScreenerError::Retrieval { .. }) if attempt < self.max_retries => {
                    let delay = self.backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    tracing::warn!(
                        code,
                        market,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying request"
                    );
                    thread::sleep(delay);
                }
                other => return other,
            }
        }
    }
}

impl<P: DataPort> DataPort for ThrottledDataPort<P> {
    fn fetch_daily_bars(
        &self,
        code: &str,
        market: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, ScreenerError> {
        self.with_retry(code, market, || {
            self.inner.fetch_daily_bars(code, market, start_date, end_date)
        })
    }

    fn list_instruments(&self, market: &str) -> Result<Vec<Listing>, ScreenerError> {
        self.with_retry("*", market, || self.inner.list_instruments(market))
    }
}
