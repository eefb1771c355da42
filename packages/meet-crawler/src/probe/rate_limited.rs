//! Rate-limited prober wrapper.
//!
//! The results host is shared infrastructure; every request from a pass goes
//! through one governor quota regardless of how many meets are in flight.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::ProbeResult;

use super::{ProbeOutcome, Prober};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A prober wrapper that enforces a requests-per-second quota.
pub struct RateLimitedProber<P: Prober> {
    inner: P,
    limiter: Arc<DefaultRateLimiter>,
}

impl<P: Prober> RateLimitedProber<P> {
    pub fn new(prober: P, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(prober, Quota::per_second(requests_per_second))
    }

    pub fn with_quota(prober: P, quota: Quota) -> Self {
        Self {
            inner: prober,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Prober> Prober for RateLimitedProber<P> {
    async fn probe(&self, url: &str) -> ProbeResult<ProbeOutcome> {
        self.limiter.until_ready().await;
        self.inner.probe(url).await
    }

    async fn fetch(&self, url: &str) -> ProbeResult<Option<String>> {
        self.limiter.until_ready().await;
        self.inner.fetch(url).await
    }
}

/// Extension trait for easy rate limiting.
pub trait ProberExt: Prober + Sized {
    fn rate_limited(self, requests_per_second: NonZeroU32) -> RateLimitedProber<Self> {
        RateLimitedProber::new(self, requests_per_second)
    }
}

impl<P: Prober + Sized> ProberExt for P {}
