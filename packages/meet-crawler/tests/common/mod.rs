//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use meet_crawler::testing::MockSite;
use meet_crawler::{CrawlerConfig, Meet, MemoryStore, Orchestrator, SiteLayout};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A one-day outdoor meet in the given year.
pub fn outdoor_meet(code: &str, year: i32) -> Meet {
    Meet::new(code, date(year, 6, 1), date(year, 6, 1), "outdoor")
}

pub fn layout() -> SiteLayout {
    SiteLayout::default()
}

pub fn orchestrator(site: &MockSite, meets: Vec<Meet>) -> Orchestrator<MockSite, MemoryStore> {
    orchestrator_with(site, meets, CrawlerConfig::default())
}

pub fn orchestrator_with(
    site: &MockSite,
    meets: Vec<Meet>,
    config: CrawlerConfig,
) -> Orchestrator<MockSite, MemoryStore> {
    Orchestrator::new(site.clone(), MemoryStore::with_meets(meets), config)
        .expect("config is valid")
}
