//! Link extraction, one strategy per generation.
//!
//! A `LinkExtractor` knows which index pages its generation publishes and how
//! to read (label, reference) pairs off them. `extract_links` drives the
//! fetches and merges the per-page results.

pub mod markup;

pub use markup::landing_has_results;

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::{ExtractResult, ProbeResult};
use crate::layout::{MeetUrls, OldScheme};
use crate::probe::Prober;
use crate::types::{Generation, GenerationFamily, LinkPair, PublicationStatus};

/// A fetched index page.
#[derive(Debug, Clone)]
pub struct IndexPage {
    pub url: String,
    pub body: String,
}

/// Generation-specific extraction rule.
pub trait LinkExtractor: Send + Sync {
    fn family(&self) -> GenerationFamily;

    /// Index pages to fetch for a meet with the given status.
    fn index_urls(&self, urls: &MeetUrls, status: PublicationStatus) -> Vec<String>;

    /// Parse one fetched index page.
    fn extract(&self, page: &IndexPage) -> ExtractResult<Vec<LinkPair>>;
}

/// New generation: entries index, plus results index once results are out.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewExtractor;

impl LinkExtractor for NewExtractor {
    fn family(&self) -> GenerationFamily {
        GenerationFamily::New
    }

    fn index_urls(&self, urls: &MeetUrls, status: PublicationStatus) -> Vec<String> {
        let mut pages = vec![urls.new_entries_index()];
        if status == PublicationStatus::Results {
            pages.push(urls.new_results_index());
        }
        pages
    }

    fn extract(&self, page: &IndexPage) -> ExtractResult<Vec<LinkPair>> {
        markup::new_index_pairs(&page.url, &page.body)
    }
}

/// Old generation with a known page count.
#[derive(Debug, Clone, Copy)]
pub struct OldExtractor {
    pub pages: u32,
}

impl LinkExtractor for OldExtractor {
    fn family(&self) -> GenerationFamily {
        GenerationFamily::Old
    }

    fn index_urls(&self, urls: &MeetUrls, status: PublicationStatus) -> Vec<String> {
        let mut pages = Vec::new();
        for index in 1..=self.pages {
            if status == PublicationStatus::Results {
                pages.push(urls.old_page(OldScheme::Results, index));
            }
            pages.push(urls.old_page(OldScheme::Entries, index));
        }
        pages
    }

    fn extract(&self, page: &IndexPage) -> ExtractResult<Vec<LinkPair>> {
        markup::old_index_pairs(&page.url, &page.body)
    }
}

/// Ancient generation: everything hangs off the landing page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AncientExtractor;

impl LinkExtractor for AncientExtractor {
    fn family(&self) -> GenerationFamily {
        GenerationFamily::Ancient
    }

    fn index_urls(&self, urls: &MeetUrls, _status: PublicationStatus) -> Vec<String> {
        vec![urls.landing()]
    }

    fn extract(&self, page: &IndexPage) -> ExtractResult<Vec<LinkPair>> {
        markup::ancient_index_pairs(&page.url, &page.body)
    }
}

/// Extraction rule for a generation; `None` for `Unknown`.
pub fn extractor_for(generation: Generation) -> Option<Box<dyn LinkExtractor>> {
    match generation {
        Generation::New => Some(Box::new(NewExtractor)),
        Generation::Old { pages } => Some(Box::new(OldExtractor { pages })),
        Generation::Ancient => Some(Box::new(AncientExtractor)),
        Generation::Unknown => None,
    }
}

/// Pairs gathered for one meet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Unique by reference, first label wins
    pub pairs: Vec<LinkPair>,
    pub pages_fetched: usize,
    /// Pages that were absent or did not have the expected markup
    pub pages_dropped: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn merge(&mut self, seen: &mut HashSet<String>, pairs: Vec<LinkPair>) {
        for pair in pairs {
            if seen.insert(pair.reference().to_string()) {
                self.pairs.push(pair);
            }
        }
    }
}

/// Fetch every index page of a meet and extract its pairs.
///
/// Absent pages and structural mismatches drop that page only. A transport
/// or status anomaly on any page aborts the whole meet.
pub async fn extract_links<P: Prober + ?Sized>(
    prober: &P,
    extractor: &dyn LinkExtractor,
    urls: &MeetUrls,
    status: PublicationStatus,
) -> ProbeResult<Extraction> {
    let mut extraction = Extraction::default();
    let mut seen = HashSet::new();

    for url in extractor.index_urls(urls, status) {
        let Some(body) = prober.fetch(&url).await? else {
            warn!(url = %url, generation = %extractor.family(), "Index page absent");
            extraction.pages_dropped += 1;
            continue;
        };
        extraction.pages_fetched += 1;

        match extractor.extract(&IndexPage { url: url.clone(), body }) {
            Ok(pairs) => {
                debug!(url = %url, pairs = pairs.len(), "Extracted index page");
                extraction.merge(&mut seen, pairs);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Dropping index page");
                extraction.pages_dropped += 1;
            }
        }
    }

    Ok(extraction)
}
