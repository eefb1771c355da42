//! End-to-end passes against a scripted host and the in-memory store.

mod common;

use chrono::{Datelike, Utc};
use common::{date, layout, orchestrator, orchestrator_with, outdoor_meet};
use meet_crawler::testing::{markup, MockResponse, MockSite};
use meet_crawler::{
    Classification, Config, CrawlerConfig, EnvironmentTag, Generation, GenerationFamily, LinkPair,
    Meet, MeetStore, MemoryStore, OldScheme, Orchestrator, PublicationStatus, StalenessPolicy,
};
use std::sync::Arc;

#[tokio::test]
async fn new_generation_meet_is_classified_and_discovered() {
    let urls = layout().meet(2025, "REG38222");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(
            urls.new_results_index(),
            markup::anchors(&[("200m Assoluti", "Gara001.htm"), ("ignored", "#")]),
        );
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG38222", 2025)]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.selected, 1);
    assert_eq!(report.classified, 1);
    assert_eq!(report.discovered.get(&GenerationFamily::New), Some(&1));
    assert_eq!(report.pages_inserted, 1);
    assert_eq!(report.failures, 0);

    let meet = orchestrator.store().get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(meet.generation, Generation::New);
    assert_eq!(meet.status, PublicationStatus::Results);
    assert!(meet.classified_at.is_some());
    assert!(meet.links_checked_at.is_some());

    let pages = orchestrator.store().list_event_pages("REG38222").await.unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].label, "200m Assoluti");
    assert_eq!(pages[0].reference, "Gara001.htm");
    assert_eq!(pages[0].generation, GenerationFamily::New);
    assert_eq!(pages[0].environment, EnvironmentTag::Outdoor);
    assert_eq!(pages[0].year, 2025);
}

#[tokio::test]
async fn old_generation_count_spans_gaps() {
    let urls = layout().meet(2022, "REG28833");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(
            urls.old_page(OldScheme::Results, 1),
            markup::old_index(&[("60m Uomini", "Gara001.htm")]),
        )
        .with_page(
            urls.old_page(OldScheme::Results, 3),
            markup::old_index(&[("Lungo Donne", "Gara014.htm")]),
        );
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG28833", 2022)]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    let meet = orchestrator.store().get_meet("REG28833").await.unwrap().unwrap();
    assert_eq!(meet.generation, Generation::Old { pages: 3 });
    assert_eq!(meet.status, PublicationStatus::Results);

    assert_eq!(report.pages_inserted, 2);
    let references: Vec<_> = orchestrator
        .store()
        .list_event_pages("REG28833")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.reference)
        .collect();
    assert_eq!(references, vec!["Gara001.htm", "Gara014.htm"]);
}

#[tokio::test]
async fn absent_landing_page_is_unknown_and_skipped() {
    let site = MockSite::new();
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG40001", 2025)]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.classified, 1);
    assert_eq!(report.skipped_unknown, 1);
    assert_eq!(report.discovered_total(), 0);
    assert_eq!(site.calls().len(), 1);

    let meet = orchestrator.store().get_meet("REG40001").await.unwrap().unwrap();
    assert_eq!(meet.generation, Generation::Unknown);
    assert_eq!(meet.status, PublicationStatus::None);
    assert!(meet.classified_at.is_some());
    assert!(meet.links_checked_at.is_none());
}

#[tokio::test]
async fn landing_anomaly_leaves_meet_untouched() {
    let urls = layout().meet(2025, "REG40002");
    let site = MockSite::new().with_status(urls.landing(), 503);
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG40002", 2025)]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.unresolved, 1);
    assert_eq!(report.classified, 0);
    assert_eq!(report.discovered_total(), 0);

    let meet = orchestrator.store().get_meet("REG40002").await.unwrap().unwrap();
    assert_eq!(meet, outdoor_meet("REG40002", 2025));
}

#[tokio::test]
async fn empty_extraction_resets_status() {
    let urls = layout().meet(2025, "REG40003");
    let site = MockSite::new().with_page(urls.new_entries_index(), markup::anchors(&[("Top", "#")]));
    let meet = outdoor_meet("REG40003", 2025)
        .with_classification(Classification::new(Generation::New, PublicationStatus::Entries));
    let orchestrator = orchestrator(&site, vec![meet]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.emptied, 1);
    assert_eq!(report.pages_inserted, 0);

    let meet = orchestrator.store().get_meet("REG40003").await.unwrap().unwrap();
    assert_eq!(meet.status, PublicationStatus::None);
    assert!(meet.links_checked_at.is_some());
    assert_eq!(orchestrator.store().page_count(), 0);
}

#[tokio::test]
async fn repeated_pass_inserts_nothing_new() {
    let urls = layout().meet(2025, "REG38222");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(
            urls.new_entries_index(),
            markup::anchors(&[("Alto Donne", "GaraL001.htm"), ("Staffetta", "Staff001.htm")]),
        );
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG38222", 2025)]);

    let first = orchestrator.run(&StalenessPolicy::All).await.unwrap();
    let second = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(first.pages_inserted, 2);
    assert_eq!(second.pages_inserted, 0);
    assert_eq!(second.classified, 0);
    assert_eq!(orchestrator.store().page_count(), 2);

    let meet = orchestrator.store().get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(meet.status, PublicationStatus::Entries);
}

#[tokio::test]
async fn results_appear_on_a_later_pass() {
    let urls = layout().meet(2025, "REG38222");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(urls.new_entries_index(), markup::anchors(&[("100m", "GaraL001.htm")]));
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG38222", 2025)]);

    orchestrator.run(&StalenessPolicy::All).await.unwrap();
    let meet = orchestrator.store().get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(meet.status, PublicationStatus::Entries);

    // Results index goes live; reclassify to pick up the new status
    site.set_response(
        urls.new_results_index(),
        MockResponse::Page(markup::anchors(&[("100m", "Gara001.htm")])),
    );
    orchestrator
        .store()
        .record_classification("REG38222", Classification::unknown(), chrono::Utc::now())
        .await
        .unwrap();
    let report = orchestrator.run(&StalenessPolicy::Unclassified).await.unwrap();

    assert_eq!(report.pages_inserted, 1);
    let meet = orchestrator.store().get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(meet.status, PublicationStatus::Results);
    assert_eq!(orchestrator.store().page_count(), 2);
}

#[tokio::test]
async fn retracted_results_regress_to_none() {
    let urls = layout().meet(2011, "REG1806");
    let site = MockSite::new().with_page(
        urls.landing(),
        markup::ancient_landing(&[("100m", "Gara001.htm"), ("Iscritti", "Staff001.htm")]),
    );
    let orchestrator = orchestrator(&site, vec![outdoor_meet("REG1806", 2011)]);

    orchestrator.run(&StalenessPolicy::All).await.unwrap();
    let meet = orchestrator.store().get_meet("REG1806").await.unwrap().unwrap();
    assert_eq!(meet.generation, Generation::Ancient);
    assert_eq!(meet.status, PublicationStatus::Results);

    site.set_response(urls.landing(), MockResponse::Page("<html><body></body></html>".into()));
    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.emptied, 1);
    let meet = orchestrator.store().get_meet("REG1806").await.unwrap().unwrap();
    assert_eq!(meet.status, PublicationStatus::None);
    assert_eq!(meet.generation, Generation::Ancient);
    // Stored pages are never removed
    assert_eq!(orchestrator.store().page_count(), 2);
}

#[tokio::test]
async fn broken_old_page_does_not_drop_siblings() {
    let urls = layout().meet(2020, "REG22800");
    let site = MockSite::new()
        .with_page(
            urls.old_page(OldScheme::Entries, 1),
            markup::old_index(&[("60m", "GaraL001.htm")]),
        )
        .with_page(urls.old_page(OldScheme::Entries, 2), "<html><body>Errore</body></html>");
    let meet = outdoor_meet("REG22800", 2020).with_classification(Classification::new(
        Generation::Old { pages: 2 },
        PublicationStatus::Entries,
    ));
    let orchestrator = orchestrator(&site, vec![meet]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.failures, 0);
    assert_eq!(report.pages_inserted, 1);
}

#[tokio::test]
async fn transport_failure_fails_only_that_meet() {
    let healthy = layout().meet(2025, "REG1");
    let broken = layout().meet(2025, "REG2");
    let site = MockSite::new()
        .with_page(healthy.new_entries_index(), markup::anchors(&[("60m", "GaraL001.htm")]))
        .with_transport_failure(broken.new_entries_index());

    let classification = Classification::new(Generation::New, PublicationStatus::Entries);
    let orchestrator = orchestrator(
        &site,
        vec![
            outdoor_meet("REG1", 2025).with_classification(classification),
            outdoor_meet("REG2", 2025).with_classification(classification),
        ],
    );

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.failures, 1);
    assert_eq!(report.pages_inserted, 1);
    let broken_meet = orchestrator.store().get_meet("REG2").await.unwrap().unwrap();
    assert!(broken_meet.links_checked_at.is_none());
}

#[tokio::test]
async fn policy_limits_the_pass() {
    let site = MockSite::new();
    let today = chrono::Utc::now().date_naive();
    let classification = Classification::new(Generation::Ancient, PublicationStatus::Entries);

    let mut finished = outdoor_meet("DONE", 2020).with_classification(classification);
    finished.start_date = today - chrono::Duration::days(2);
    finished.end_date = today - chrono::Duration::days(1);
    let ancient_history = outdoor_meet("OLD", 2019).with_classification(classification);

    let orchestrator = orchestrator(&site, vec![finished, ancient_history]);

    let report = orchestrator
        .run(&StalenessPolicy::FinishedWithin { days: 7 })
        .await
        .unwrap();
    assert_eq!(report.selected, 1);

    let report = orchestrator
        .run(&StalenessPolicy::Explicit {
            codes: vec!["OLD".into(), "MISSING".into()],
        })
        .await
        .unwrap();
    assert_eq!(report.selected, 1);
}

#[tokio::test]
async fn concurrent_persists_never_duplicate() {
    use meet_crawler::{DiscoveryBatch, MemoryStore, Persister};
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::with_meets([outdoor_meet("REG1", 2025)]));
    let persister = Arc::new(Persister::new());
    let batch = DiscoveryBatch {
        meet_code: "REG1".into(),
        generation: GenerationFamily::New,
        environment: EnvironmentTag::Outdoor,
        year: 2025,
        pairs: (1..=20)
            .map(|n| LinkPair::new(&format!("Gara {}", n), &format!("GaraL{:03}.htm", n)))
            .collect(),
        checked_at: chrono::Utc::now(),
    };

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let persister = persister.clone();
            let batch = batch.clone();
            tokio::spawn(async move { persister.persist(&store, &batch).await.unwrap().inserted })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        inserted += handle.await.unwrap();
    }

    assert_eq!(inserted, 20);
    assert_eq!(store.page_count(), 20);
}

#[tokio::test]
async fn multi_day_meet_uses_start_year() {
    let urls = layout().meet(2024, "REG5000");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(urls.new_entries_index(), markup::anchors(&[("Cross", "GaraL001.htm")]));
    let mut meet = outdoor_meet("REG5000", 2024);
    meet.start_date = date(2024, 12, 31);
    meet.end_date = date(2025, 1, 1);
    let orchestrator = orchestrator(&site, vec![meet]);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.pages_inserted, 1);
    let pages = orchestrator.store().list_event_pages("REG5000").await.unwrap();
    assert_eq!(pages[0].year, 2024);
}

#[tokio::test]
async fn reclassify_promotes_entries_to_results() {
    let urls = layout().meet(2025, "REG38222");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(urls.new_entries_index(), markup::anchors(&[("100m", "GaraL001.htm")]))
        .with_page(urls.new_results_index(), markup::anchors(&[("100m Finale", "Gara001.htm")]));
    let meet = outdoor_meet("REG38222", 2025)
        .with_classification(Classification::new(Generation::New, PublicationStatus::Entries));
    let store = Arc::new(MemoryStore::with_meets(vec![meet]));

    // Without reclassify the stored entries status decides what is read
    let plain = Orchestrator::new(site.clone(), store.clone(), CrawlerConfig::default()).unwrap();
    let report = plain.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.classified, 0);
    assert_eq!(report.pages_inserted, 1);
    let meet = store.get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(meet.status, PublicationStatus::Entries);

    let config = CrawlerConfig::default().with_reclassify(true);
    let reclassifying = Orchestrator::new(site.clone(), store.clone(), config).unwrap();
    let report = reclassifying.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.classified, 1);
    assert_eq!(report.pages_inserted, 1);
    let meet = store.get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(meet.generation, Generation::New);
    assert_eq!(meet.status, PublicationStatus::Results);

    let references: Vec<_> = store
        .list_event_pages("REG38222")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.reference)
        .collect();
    assert_eq!(references, vec!["Gara001.htm", "GaraL001.htm"]);
}

#[tokio::test]
async fn default_policies_pick_up_a_freshly_loaded_meet() {
    let today = Utc::now().date_naive();
    let urls = layout().meet(today.year(), "REG41000");
    let site = MockSite::new()
        .with_existing(urls.landing())
        .with_page(urls.new_entries_index(), markup::anchors(&[("100m", "GaraL001.htm")]));

    let config = Config::from_lookup(|key| {
        (key == "DATABASE_URL").then(|| "postgres://localhost/athletics".to_string())
    })
    .unwrap();
    let meet = Meet::new("REG41000", today, today, "outdoor");
    let orchestrator = orchestrator_with(&site, vec![meet], config.crawler);

    let report = orchestrator.run(&config.policy).await.unwrap();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.classified, 1);
    assert_eq!(report.selected, 1);
    assert_eq!(report.pages_inserted, 1);

    let meet = orchestrator.store().get_meet("REG41000").await.unwrap().unwrap();
    assert_eq!(meet.generation, Generation::New);
    assert_eq!(meet.status, PublicationStatus::Entries);
    assert!(meet.links_checked_at.is_some());
}

#[tokio::test]
async fn unresolved_refresh_skips_discovery() {
    let urls = layout().meet(2025, "REG38222");
    let site = MockSite::new()
        .with_status(urls.landing(), 503)
        .with_page(urls.new_entries_index(), markup::anchors(&[("100m", "GaraL001.htm")]));
    let meet = outdoor_meet("REG38222", 2025)
        .with_classification(Classification::new(Generation::New, PublicationStatus::Entries));
    let config = CrawlerConfig::default().with_classify_policy(StalenessPolicy::All);
    let orchestrator = orchestrator_with(&site, vec![meet.clone()], config);

    let report = orchestrator.run(&StalenessPolicy::All).await.unwrap();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.unresolved, 1);
    assert_eq!(report.selected, 1);
    assert_eq!(report.discovered_total(), 0);
    assert_eq!(site.hits(&urls.landing()), 1);
    assert_eq!(site.hits(&urls.new_entries_index()), 0);

    let stored = orchestrator.store().get_meet("REG38222").await.unwrap().unwrap();
    assert_eq!(stored, meet);
}
