//! Existence probing against the results host.
//!
//! - `HttpProber` - reqwest-backed probing and page fetches
//! - `RateLimitedProber` - wrapper that throttles any prober

pub mod http;
pub mod rate_limited;

pub use http::HttpProber;
pub use rate_limited::{ProberExt, RateLimitedProber};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProbeResult;

/// The only two outcomes a probe is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Exists,
    Absent,
}

impl ProbeOutcome {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Exists)
    }
}

/// Map an HTTP status to a probe outcome. 200 and 404 are the contract.
///
/// Redirects are resolved by the prober first; a 3xx that still reaches
/// this point is an anomaly like any other status.
pub fn outcome_for_status(url: &str, status: u16) -> ProbeResult<ProbeOutcome> {
    match status {
        200 => Ok(ProbeOutcome::Exists),
        404 => Ok(ProbeOutcome::Absent),
        other => Err(crate::error::ProbeError::UnexpectedStatus {
            url: url.to_string(),
            status: other,
        }),
    }
}

/// Read-only access to the results host.
///
/// Passed explicitly into every component; there is no shared session.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Check whether a URL exists.
    async fn probe(&self, url: &str) -> ProbeResult<ProbeOutcome>;

    /// Fetch a page body. `Ok(None)` means the page is absent.
    async fn fetch(&self, url: &str) -> ProbeResult<Option<String>>;
}

#[async_trait]
impl<P: Prober + ?Sized> Prober for Arc<P> {
    async fn probe(&self, url: &str) -> ProbeResult<ProbeOutcome> {
        (**self).probe(url).await
    }

    async fn fetch(&self, url: &str) -> ProbeResult<Option<String>> {
        (**self).fetch(url).await
    }
}
