//! Crawl pass orchestration.
//!
//! A pass optionally re-classifies the meets due under a classification
//! policy, then selects meets under a discovery policy, classifies the ones
//! whose generation is not known yet and discovers event pages generation by
//! generation. Meets run through a bounded pool; every failure is scoped to
//! its meet and counted in the [`RunReport`].

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::config::CrawlerConfig;
use crate::error::{ConfigError, CrawlError, StoreResult};
use crate::extract::{extract_links, extractor_for};
use crate::layout::SiteLayout;
use crate::persister::{DiscoveryBatch, Persister};
use crate::policy::StalenessPolicy;
use crate::probe::Prober;
use crate::store::MeetStore;
use crate::types::{EnvironmentTag, GenerationFamily, Meet};

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Meets picked by the classification policy
    pub refreshed: usize,
    /// Meets picked by the discovery policy
    pub selected: usize,
    /// Classifier resolved the meet (including to unknown)
    pub classified: usize,
    /// Classifier hit an anomaly; retried next pass
    pub unresolved: usize,
    /// Generation still unknown at discovery time
    pub skipped_unknown: usize,
    /// Event type has no environment tag
    pub skipped: usize,
    /// Meets whose discovery completed, per generation
    pub discovered: BTreeMap<GenerationFamily, usize>,
    pub pages_inserted: usize,
    /// Meets whose discovery found nothing
    pub emptied: usize,
    pub failures: usize,
    pub timed_out: bool,
}

impl RunReport {
    pub fn discovered_total(&self) -> usize {
        self.discovered.values().sum()
    }
}

enum DiscoveryOutcome {
    Persisted { inserted: usize },
    Emptied,
    Skipped,
}

/// Drives classification and discovery for a set of meets.
pub struct Orchestrator<P, S> {
    prober: P,
    store: S,
    layout: SiteLayout,
    classifier: Classifier,
    persister: Persister,
    config: CrawlerConfig,
}

impl<P: Prober, S: MeetStore> Orchestrator<P, S> {
    pub fn new(prober: P, store: S, config: CrawlerConfig) -> Result<Self, ConfigError> {
        let layout = SiteLayout::new(&config.base_url)?;
        let classifier =
            Classifier::new(layout.clone()).with_pagination_bound(config.pagination_bound);

        Ok(Self {
            prober,
            store,
            layout,
            classifier,
            persister: Persister::new(),
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Run one pass now.
    pub async fn run(&self, policy: &StalenessPolicy) -> StoreResult<RunReport> {
        self.run_at(policy, Utc::now()).await
    }

    /// Run one pass as of `now`.
    ///
    /// When a classification policy is configured, the meets it selects are
    /// re-classified first; `policy` then selects meets for discovery from
    /// the updated store. Only a failure to select meets is returned as an
    /// error.
    pub async fn run_at(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<RunReport> {
        let mut report = RunReport::default();

        info!(
            policy = %policy,
            classify_policy = ?self.config.classify_policy.as_ref().map(ToString::to_string),
            "Starting crawl pass"
        );

        let stages = self.run_stages(policy, now, &mut report);
        match self.config.run_timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, stages).await;
                match outcome {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!(timeout_secs = limit.as_secs(), "Crawl pass timed out; remaining meets left for next pass");
                        report.timed_out = true;
                    }
                }
            }
            None => stages.await?,
        }

        info!(
            refreshed = report.refreshed,
            selected = report.selected,
            classified = report.classified,
            unresolved = report.unresolved,
            discovered = report.discovered_total(),
            pages_inserted = report.pages_inserted,
            emptied = report.emptied,
            failures = report.failures,
            timed_out = report.timed_out,
            "Crawl pass complete"
        );

        Ok(report)
    }

    async fn run_stages(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> StoreResult<()> {
        // Codes the refresh stage tried, and the subset it resolved
        let mut attempted = HashSet::new();
        let mut resolved = HashSet::new();

        if let Some(classify_policy) = &self.config.classify_policy {
            let due = self.store.select_meets(classify_policy, now).await?;
            report.refreshed = due.len();
            info!(policy = %classify_policy, meets = due.len(), "Refreshing classifications");

            attempted.extend(due.iter().map(|m| m.code.clone()));
            let classified = self.classification_stage(due, now, report).await;
            resolved.extend(classified.into_iter().map(|m| m.code));
        }

        let selected = self.store.select_meets(policy, now).await?;
        report.selected = selected.len();
        info!(policy = %policy, selected = selected.len(), "Selected meets for discovery");

        // A meet the refresh could not resolve waits for the next pass
        let (pending, mut ready): (Vec<_>, Vec<_>) = selected
            .into_iter()
            .filter(|m| !attempted.contains(&m.code) || resolved.contains(&m.code))
            .partition(|m| {
                !resolved.contains(&m.code)
                    && (self.config.reclassify || !m.generation.is_known())
            });

        ready.extend(self.classification_stage(pending, now, report).await);
        self.discovery_stage(ready, now, report).await;
        Ok(())
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency.max(1)
    }

    /// Classify every meet given; returns the ones that resolved.
    async fn classification_stage(
        &self,
        meets: Vec<Meet>,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) -> Vec<Meet> {
        let mut ready = Vec::with_capacity(meets.len());
        if meets.is_empty() {
            return ready;
        }
        info!(meets = meets.len(), "Classifying meets");

        let mut results = stream::iter(meets)
            .map(|meet| self.classify_one(meet, now))
            .buffer_unordered(self.concurrency());

        while let Some((code, result)) = results.next().await {
            match result {
                Ok(meet) => {
                    report.classified += 1;
                    ready.push(meet);
                }
                Err(CrawlError::Probe(e)) => {
                    warn!(meet_code = %code, url = %e.url(), error = %e, "Classification unresolved");
                    report.unresolved += 1;
                }
                Err(e) => {
                    warn!(meet_code = %code, error = %e, "Classification failed");
                    report.failures += 1;
                }
            }
        }

        ready
    }

    async fn classify_one(&self, mut meet: Meet, now: DateTime<Utc>) -> (String, Result<Meet, CrawlError>) {
        let result = async {
            let classification = self
                .classifier
                .classify(&self.prober, &meet.code, meet.year())
                .await?;
            self.store
                .record_classification(&meet.code, classification, now)
                .await?;

            meet.generation = classification.generation;
            meet.status = classification.status;
            meet.classified_at = Some(now);
            Ok::<_, CrawlError>(())
        }
        .await;

        (meet.code.clone(), result.map(|_| meet))
    }

    async fn discovery_stage(&self, meets: Vec<Meet>, now: DateTime<Utc>, report: &mut RunReport) {
        let mut groups: BTreeMap<GenerationFamily, Vec<Meet>> = BTreeMap::new();
        for meet in meets {
            match meet.generation.family() {
                Some(family) => groups.entry(family).or_default().push(meet),
                None => report.skipped_unknown += 1,
            }
        }

        for (family, group) in groups {
            info!(generation = %family, meets = group.len(), "Discovering event pages");

            let mut results = stream::iter(group)
                .map(|meet| async move {
                    let result = self.discover_one(&meet, now).await;
                    (meet.code, result)
                })
                .buffer_unordered(self.concurrency());

            while let Some((code, result)) = results.next().await {
                match result {
                    Ok(DiscoveryOutcome::Persisted { inserted }) => {
                        *report.discovered.entry(family).or_default() += 1;
                        report.pages_inserted += inserted;
                    }
                    Ok(DiscoveryOutcome::Emptied) => {
                        *report.discovered.entry(family).or_default() += 1;
                        report.emptied += 1;
                    }
                    Ok(DiscoveryOutcome::Skipped) => report.skipped += 1,
                    Err(e) => {
                        warn!(meet_code = %code, generation = %family, error = %e, "Discovery failed");
                        report.failures += 1;
                    }
                }
            }
        }
    }

    async fn discover_one(&self, meet: &Meet, now: DateTime<Utc>) -> Result<DiscoveryOutcome, CrawlError> {
        let Some(environment) = EnvironmentTag::from_event_type(&meet.event_type) else {
            warn!(meet_code = %meet.code, event_type = %meet.event_type, "Unmapped event type; skipping");
            return Ok(DiscoveryOutcome::Skipped);
        };
        let (Some(extractor), Some(family)) = (extractor_for(meet.generation), meet.generation.family())
        else {
            return Ok(DiscoveryOutcome::Skipped);
        };

        let urls = self.layout.meet(meet.year(), &meet.code);
        let extraction = extract_links(&self.prober, extractor.as_ref(), &urls, meet.status).await?;

        if extraction.is_empty() {
            self.persister.record_empty(&self.store, meet, now).await?;
            return Ok(DiscoveryOutcome::Emptied);
        }

        let batch = DiscoveryBatch {
            meet_code: meet.code.clone(),
            generation: family,
            environment,
            year: meet.year(),
            pairs: extraction.pairs,
            checked_at: now,
        };
        let outcome = self.persister.persist(&self.store, &batch).await?;

        Ok(DiscoveryOutcome::Persisted {
            inserted: outcome.inserted,
        })
    }
}
