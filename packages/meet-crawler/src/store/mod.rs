//! Persistence for meets and their event pages.
//!
//! - `MemoryStore` - in-process maps, for tests and dry runs
//! - `PostgresStore` - sqlx-backed production store

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::StoreResult;
use crate::persister::{DiscoveryBatch, PersistOutcome};
use crate::policy::StalenessPolicy;
use crate::types::{Classification, EventPageRecord, Meet};

/// Storage contract used by the orchestrator and persister.
///
/// Crawler-owned columns (generation, status, timestamps) are only written by
/// `record_classification`, `apply_discovery` and `mark_unpublished`.
#[async_trait]
pub trait MeetStore: Send + Sync {
    /// Insert meets from the calendar feed, refreshing calendar columns of
    /// existing rows. Returns the number of rows touched.
    async fn upsert_meets(&self, meets: &[Meet]) -> StoreResult<usize>;

    async fn get_meet(&self, code: &str) -> StoreResult<Option<Meet>>;

    /// Meets due under a policy, ordered by code.
    async fn select_meets(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Meet>>;

    /// Write a classification result and stamp `classified_at`.
    async fn record_classification(
        &self,
        code: &str,
        classification: Classification,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Append unseen pages, update status and stamp `links_checked_at`,
    /// all or nothing.
    async fn apply_discovery(&self, batch: &DiscoveryBatch) -> StoreResult<PersistOutcome>;

    /// Empty discovery: status `none`, stamp `links_checked_at`, no rows.
    async fn mark_unpublished(&self, code: &str, at: DateTime<Utc>) -> StoreResult<()>;

    /// Stored pages of a meet, ordered by reference.
    async fn list_event_pages(&self, code: &str) -> StoreResult<Vec<EventPageRecord>>;
}

#[async_trait]
impl<S: MeetStore + ?Sized> MeetStore for Arc<S> {
    async fn upsert_meets(&self, meets: &[Meet]) -> StoreResult<usize> {
        (**self).upsert_meets(meets).await
    }

    async fn get_meet(&self, code: &str) -> StoreResult<Option<Meet>> {
        (**self).get_meet(code).await
    }

    async fn select_meets(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Meet>> {
        (**self).select_meets(policy, now).await
    }

    async fn record_classification(
        &self,
        code: &str,
        classification: Classification,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        (**self).record_classification(code, classification, at).await
    }

    async fn apply_discovery(&self, batch: &DiscoveryBatch) -> StoreResult<PersistOutcome> {
        (**self).apply_discovery(batch).await
    }

    async fn mark_unpublished(&self, code: &str, at: DateTime<Utc>) -> StoreResult<()> {
        (**self).mark_unpublished(code, at).await
    }

    async fn list_event_pages(&self, code: &str) -> StoreResult<Vec<EventPageRecord>> {
        (**self).list_event_pages(code).await
    }
}
