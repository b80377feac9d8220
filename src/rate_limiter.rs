//! Shared token-bucket rate limiter (spec.md §4.1, §5, §9 "Global rate limiter").
//!
//! The Go original (`original_source/internal/request/client.go`) keeps its limiter in a
//! file-scoped `var rl = ratelimit.New(10)`, so two clients in the same process fight over
//! one global bucket. We keep the bucket inside the `Client` instead: every `Client` owns an
//! `Arc<RateLimiter>`, shared with whatever clones of that client a scan passes around, but
//! never leaked as module-level mutable state.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota};

use crate::error::ConfigError;

/// A requests-per-second token bucket shared by every outbound request of a scan.
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Result<Arc<Self>, ConfigError> {
        let quota_per_sec = NonZeroU32::new(per_second).ok_or(ConfigError::NonPositiveRateLimit)?;
        let inner = DefaultDirectRateLimiter::direct(Quota::per_second(quota_per_sec));
        Ok(Arc::new(Self { inner }))
    }

    /// Blocks the caller until a token is available. Every outbound request made through
    /// `Client::send` must call this first (spec.md §5 "Suspension points").
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }
}
