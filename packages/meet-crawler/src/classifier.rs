//! Generation classification.
//!
//! Candidate URL shapes are probed in a fixed order; the first that exists
//! decides the generation. Only a clean 404 on the landing page yields
//! `Unknown`. An anomaly at any step is returned as an error and the caller
//! leaves the meet untouched.

use tracing::{debug, info};

use crate::error::ProbeResult;
use crate::extract::landing_has_results;
use crate::layout::{OldScheme, SiteLayout};
use crate::pagination::{discover_page_count_after_first, DEFAULT_PAGINATION_BOUND};
use crate::probe::Prober;
use crate::types::{Classification, Generation, PublicationStatus};

/// Decides (generation, status) for a meet.
#[derive(Debug, Clone)]
pub struct Classifier {
    layout: SiteLayout,
    pagination_bound: u32,
}

impl Classifier {
    pub fn new(layout: SiteLayout) -> Self {
        Self {
            layout,
            pagination_bound: DEFAULT_PAGINATION_BOUND,
        }
    }

    pub fn with_pagination_bound(mut self, bound: u32) -> Self {
        self.pagination_bound = bound.max(1);
        self
    }

    pub async fn classify<P: Prober + ?Sized>(
        &self,
        prober: &P,
        code: &str,
        year: i32,
    ) -> ProbeResult<Classification> {
        let urls = self.layout.meet(year, code);

        // The body is kept for the ancient results check
        let Some(landing) = prober.fetch(&urls.landing()).await? else {
            debug!(meet_code = %code, year, "Landing page absent");
            return Ok(Classification::unknown());
        };

        let classification = if prober.probe(&urls.new_results_index()).await?.exists() {
            Classification::new(Generation::New, PublicationStatus::Results)
        } else if prober.probe(&urls.new_entries_index()).await?.exists() {
            Classification::new(Generation::New, PublicationStatus::Entries)
        } else if prober.probe(&urls.old_page(OldScheme::Results, 1)).await?.exists() {
            let found = discover_page_count_after_first(
                prober,
                &urls,
                OldScheme::Results,
                self.pagination_bound,
            )
            .await?;
            Classification::new(Generation::Old { pages: found.count }, PublicationStatus::Results)
        } else if prober.probe(&urls.old_page(OldScheme::Entries, 1)).await?.exists() {
            let found = discover_page_count_after_first(
                prober,
                &urls,
                OldScheme::Entries,
                self.pagination_bound,
            )
            .await?;
            Classification::new(Generation::Old { pages: found.count }, PublicationStatus::Entries)
        } else if landing_has_results(&landing) {
            Classification::new(Generation::Ancient, PublicationStatus::Results)
        } else {
            Classification::new(Generation::Ancient, PublicationStatus::Entries)
        };

        info!(
            meet_code = %code,
            year,
            generation = %classification.generation,
            status = %classification.status,
            "Classified meet"
        );

        Ok(classification)
    }
}
