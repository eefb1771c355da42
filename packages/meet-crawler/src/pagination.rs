//! Page-count discovery for the old generation.
//!
//! The host never says how many `...BYEVENT{n}.htm` pages a meet has. We
//! probe every index up to a hard bound and keep the highest one that exists,
//! so a missing page in the middle does not cut the count short.

use crate::error::ProbeResult;
use crate::layout::{MeetUrls, OldScheme};
use crate::probe::Prober;

/// Default hard upper bound on probed page indices.
pub const DEFAULT_PAGINATION_BOUND: u32 = 30;

/// Result of a pagination walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCount {
    /// Highest index that exists, 0 if none does
    pub count: u32,
    /// The bound itself exists; there may be more pages beyond it
    pub saturated: bool,
}

/// Probe indices `1..=bound` in order and return the highest that exists.
///
/// Any anomaly aborts the walk: a count built on a failed probe would be
/// unreliable.
pub async fn discover_page_count<P: Prober + ?Sized>(
    prober: &P,
    urls: &MeetUrls,
    scheme: OldScheme,
    bound: u32,
) -> ProbeResult<PageCount> {
    walk(prober, urls, scheme, 1, bound).await
}

/// Same walk when page 1 is already known to exist.
pub async fn discover_page_count_after_first<P: Prober + ?Sized>(
    prober: &P,
    urls: &MeetUrls,
    scheme: OldScheme,
    bound: u32,
) -> ProbeResult<PageCount> {
    walk(prober, urls, scheme, 2, bound).await
}

async fn walk<P: Prober + ?Sized>(
    prober: &P,
    urls: &MeetUrls,
    scheme: OldScheme,
    first: u32,
    bound: u32,
) -> ProbeResult<PageCount> {
    let bound = bound.max(1);
    let mut count = first - 1;

    for index in first..=bound {
        let url = urls.old_page(scheme, index);
        if prober.probe(&url).await?.exists() {
            count = index;
        }
    }

    let saturated = count == bound;
    if saturated {
        tracing::warn!(
            root = %urls.root(),
            scheme = ?scheme,
            bound,
            "Pagination reached the configured bound; later pages are not discovered"
        );
    }

    Ok(PageCount { count, saturated })
}
