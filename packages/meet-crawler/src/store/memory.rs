//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::persister::{derive_status, fresh_pairs, DiscoveryBatch, PersistOutcome};
use crate::policy::StalenessPolicy;
use crate::types::{Classification, EventPageRecord, Meet, PublicationStatus};

#[derive(Debug, Default)]
struct State {
    meets: BTreeMap<String, Meet>,
    /// Pages per meet code, keyed by reference
    pages: BTreeMap<String, BTreeMap<String, EventPageRecord>>,
}

/// In-memory storage for meets and event pages.
///
/// Every write happens under one lock, so a discovery is applied atomically.
/// Not suitable for production as data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with calendar rows.
    pub fn with_meets(meets: impl IntoIterator<Item = Meet>) -> Self {
        let store = Self::new();
        {
            let mut state = store.write();
            for meet in meets {
                state.meets.insert(meet.code.clone(), meet);
            }
        }
        store
    }

    /// Total stored event pages across all meets.
    pub fn page_count(&self) -> usize {
        self.read().pages.values().map(BTreeMap::len).sum()
    }

    pub fn meet_count(&self) -> usize {
        self.read().meets.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn meet_mut<'a>(state: &'a mut State, code: &str) -> StoreResult<&'a mut Meet> {
    state.meets.get_mut(code).ok_or_else(|| StoreError::MeetNotFound {
        code: code.to_string(),
    })
}

#[async_trait]
impl super::MeetStore for MemoryStore {
    async fn upsert_meets(&self, meets: &[Meet]) -> StoreResult<usize> {
        let mut state = self.write();

        for meet in meets {
            match state.meets.get_mut(&meet.code) {
                Some(existing) => {
                    existing.name = meet.name.clone();
                    existing.start_date = meet.start_date;
                    existing.end_date = meet.end_date;
                    existing.event_type = meet.event_type.clone();
                }
                None => {
                    state.meets.insert(meet.code.clone(), meet.clone());
                }
            }
        }

        Ok(meets.len())
    }

    async fn get_meet(&self, code: &str) -> StoreResult<Option<Meet>> {
        Ok(self.read().meets.get(code).cloned())
    }

    async fn select_meets(
        &self,
        policy: &StalenessPolicy,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Meet>> {
        Ok(self
            .read()
            .meets
            .values()
            .filter(|m| policy.matches(m, now))
            .cloned()
            .collect())
    }

    async fn record_classification(
        &self,
        code: &str,
        classification: Classification,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.write();
        let meet = meet_mut(&mut state, code)?;

        meet.generation = classification.generation;
        meet.status = classification.status;
        meet.classified_at = Some(at);
        Ok(())
    }

    async fn apply_discovery(&self, batch: &DiscoveryBatch) -> StoreResult<PersistOutcome> {
        let mut state = self.write();
        meet_mut(&mut state, &batch.meet_code)?;

        let stored = state.pages.entry(batch.meet_code.clone()).or_default();

        let fresh: Vec<EventPageRecord> = fresh_pairs(&batch.pairs, stored.keys())
            .into_iter()
            .map(|pair| EventPageRecord {
                meet_code: batch.meet_code.clone(),
                generation: batch.generation,
                environment: batch.environment,
                reference: pair.reference().to_string(),
                label: pair.label().to_string(),
                year: batch.year,
                discovered_at: batch.checked_at,
            })
            .collect();
        let inserted = fresh.len();

        for record in fresh {
            stored.insert(record.reference.clone(), record);
        }
        let status = derive_status(&batch.pairs, stored.keys().map(String::as_str));

        let meet = meet_mut(&mut state, &batch.meet_code)?;
        meet.status = status;
        meet.links_checked_at = Some(batch.checked_at);

        Ok(PersistOutcome { inserted, status })
    }

    async fn mark_unpublished(&self, code: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.write();
        let meet = meet_mut(&mut state, code)?;

        meet.status = PublicationStatus::None;
        meet.links_checked_at = Some(at);
        Ok(())
    }

    async fn list_event_pages(&self, code: &str) -> StoreResult<Vec<EventPageRecord>> {
        Ok(self
            .read()
            .pages
            .get(code)
            .map(|pages| pages.values().cloned().collect())
            .unwrap_or_default())
    }
}
