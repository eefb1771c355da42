//! Deduplicating persistence of discovered event pages.
//!
//! Stores call [`fresh_pairs`] and [`derive_status`] inside their own atomic
//! unit; the [`Persister`] adds per-meet serialisation on top so two workers
//! never interleave read-diff-insert for the same meet.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::store::MeetStore;
use crate::types::{
    is_final_results_reference, EnvironmentTag, GenerationFamily, LinkPair, Meet,
    PublicationStatus,
};

/// Everything discovered for one meet in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryBatch {
    pub meet_code: String,
    pub generation: GenerationFamily,
    pub environment: EnvironmentTag,
    pub year: i32,
    pub pairs: Vec<LinkPair>,
    pub checked_at: DateTime<Utc>,
}

/// What a persist call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub inserted: usize,
    pub status: PublicationStatus,
}

/// Pairs whose reference is not already stored, in input order.
///
/// Labels are ignored: a known reference with a new label is not an update.
pub fn fresh_pairs<'a, I>(pairs: &'a [LinkPair], stored: I) -> Vec<&'a LinkPair>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut known: HashSet<String> = stored
        .into_iter()
        .map(|r| r.as_ref().to_string())
        .collect();

    pairs
        .iter()
        .filter(|p| known.insert(p.reference().to_string()))
        .collect()
}

/// Status after a non-empty discovery: results as soon as any extracted or
/// stored reference names a final-results page.
pub fn derive_status<'a, I>(pairs: &'a [LinkPair], stored: I) -> PublicationStatus
where
    I: IntoIterator<Item = &'a str>,
{
    let has_results = pairs
        .iter()
        .map(LinkPair::reference)
        .chain(stored)
        .any(is_final_results_reference);

    if has_results {
        PublicationStatus::Results
    } else {
        PublicationStatus::Entries
    }
}

/// One async mutex per meet code.
#[derive(Debug, Default)]
pub struct MeetLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MeetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for a meet code, created on first use.
    pub fn lock_for(&self, code: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `work` holding the lock for `code`, then drop the entry unless
    /// another task is waiting on it.
    pub async fn with_lock<T>(&self, code: &str, work: impl Future<Output = T>) -> T {
        let output = {
            let lock = self.lock_for(code);
            let _guard = lock.lock().await;
            work.await
        };
        self.release(code);
        output
    }

    /// Remove the entry for `code` if no handle to it is held outside the map.
    pub fn release(&self, code: &str) {
        self.locks.remove_if(code, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Serialised, deduplicating writer of discovery results.
#[derive(Debug, Default)]
pub struct Persister {
    locks: MeetLocks,
}

impl Persister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append new pages and update the meet's status in one unit.
    pub async fn persist<S: MeetStore + ?Sized>(
        &self,
        store: &S,
        batch: &DiscoveryBatch,
    ) -> StoreResult<PersistOutcome> {
        let outcome = self
            .locks
            .with_lock(&batch.meet_code, store.apply_discovery(batch))
            .await?;

        info!(
            meet_code = %batch.meet_code,
            generation = %batch.generation,
            extracted = batch.pairs.len(),
            inserted = outcome.inserted,
            status = %outcome.status,
            "Persisted event pages"
        );

        Ok(outcome)
    }

    /// Terminal outcome for an extraction that found nothing.
    pub async fn record_empty<S: MeetStore + ?Sized>(
        &self,
        store: &S,
        meet: &Meet,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        if meet.status == PublicationStatus::Results {
            warn!(
                meet_code = %meet.code,
                "Meet previously had results but no pages were found; status regresses to none"
            );
        } else {
            info!(meet_code = %meet.code, "No event pages found");
        }

        self.locks
            .with_lock(&meet.code, store.mark_unpublished(&meet.code, at))
            .await
    }
}
