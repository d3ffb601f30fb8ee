//! End-to-end refresh and read path over stubbed external services

mod helpers;

use grants_ai::models::{Application, Features, RoundRef};
use grants_ai::services::{ApplicationAssembler, AssemblyError, CyclePhase};
use grants_common::cache::KvCacheExt;
use grants_common::{KvCache, MemoryCache, SqliteCache};
use helpers::{application, features, orchestrator, StubExtractor, StubSource};
use std::sync::Arc;
use std::time::Duration;

const FAST: Duration = Duration::from_millis(1);

#[tokio::test]
async fn test_refresh_then_assemble() {
    let round = RoundRef::new(10, 9);
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let source = Arc::new(StubSource::new().with_round(
        round,
        vec![
            application(10, 9, "1", "Gamma"),
            application(10, 9, "2", "Alpha"),
            application(10, 9, "3", "Beta"),
        ],
    ));
    let extractor = Arc::new(StubExtractor::new(features(&["Climate"])).failing_for(&["3"]));
    let orchestrator = orchestrator(cache.clone(), source, extractor, &[round], FAST);

    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.applications_fetched, 3);
    assert_eq!(report.features_extracted, 2);
    assert_eq!(report.features_failed, 1);

    let assembler = ApplicationAssembler::new(cache, vec![round].into());
    let enriched = assembler.assemble().await.unwrap();

    let ref_ids: Vec<_> = enriched.iter().map(|e| e.ref_id.as_str()).collect();
    assert_eq!(ref_ids, vec!["10:9:2", "10:9:1"]);
    assert!(enriched[0].tags.contains(&"DAO governed".to_string()));
    assert!(enriched[0].tags.contains(&"Solo founder".to_string()));
}

#[tokio::test]
async fn test_failed_extraction_is_retried_next_cycle() {
    let round = RoundRef::new(10, 9);
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let source = Arc::new(StubSource::new().with_round(round, vec![application(10, 9, "1", "Alpha")]));

    let failing = Arc::new(StubExtractor::new(features(&["Climate"])).failing_for(&["1"]));
    orchestrator(cache.clone(), source.clone(), failing, &[round], FAST)
        .run_cycle()
        .await
        .unwrap();
    assert!(!cache.has("application:10:9:1:features").await.unwrap());

    let healthy = Arc::new(StubExtractor::new(features(&["Climate"])));
    let report = orchestrator(cache.clone(), source, healthy.clone(), &[round], FAST)
        .run_cycle()
        .await
        .unwrap();

    assert_eq!(healthy.call_count(), 1);
    assert_eq!(report.features_extracted, 1);
    assert!(cache.has("application:10:9:1:features").await.unwrap());
}

#[tokio::test]
async fn test_classifier_calls_are_spaced() {
    let round = RoundRef::new(10, 9);
    let interval = Duration::from_millis(40);
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let apps = (1..=4)
        .map(|i| application(10, 9, &i.to_string(), &format!("Project {}", i)))
        .collect();
    let source = Arc::new(StubSource::new().with_round(round, apps));
    let extractor = Arc::new(StubExtractor::new(features(&["Tag"])));

    orchestrator(cache, source, extractor.clone(), &[round], interval)
        .run_cycle()
        .await
        .unwrap();

    let mut starts = extractor.start_times();
    starts.sort();
    assert_eq!(starts.len(), 4);
    for pair in starts.windows(2) {
        // Small tolerance for timer granularity
        assert!(pair[1] - pair[0] >= interval - Duration::from_millis(5));
    }
}

#[tokio::test]
async fn test_calls_never_overlap() {
    let round = RoundRef::new(10, 9);
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let apps = (1..=3)
        .map(|i| application(10, 9, &i.to_string(), &format!("Project {}", i)))
        .collect();
    let source = Arc::new(StubSource::new().with_round(round, apps));
    let delay = Duration::from_millis(30);
    let extractor = Arc::new(StubExtractor::new(features(&["Tag"])).with_delay(delay));

    // Interval shorter than the call itself: the in-flight limit governs
    orchestrator(cache, source, extractor.clone(), &[round], FAST)
        .run_cycle()
        .await
        .unwrap();

    let mut starts = extractor.start_times();
    starts.sort();
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= delay - Duration::from_millis(5));
    }
}

#[tokio::test]
async fn test_round_failure_keeps_previous_snapshot() {
    let healthy = RoundRef::new(10, 9);
    let flaky = RoundRef::new(42161, 26);
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let source = Arc::new(
        StubSource::new()
            .with_round(healthy, vec![application(10, 9, "1", "Alpha")])
            .with_round(flaky, vec![application(42161, 26, "7", "Beta")]),
    );
    let extractor = Arc::new(StubExtractor::new(features(&["Tag"])));
    let orchestrator = orchestrator(cache.clone(), source.clone(), extractor, &[healthy, flaky], FAST);

    orchestrator.run_cycle().await.unwrap();
    source.remove_round(flaky);
    let report = orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.rounds_failed, vec![flaky]);
    let assembler = ApplicationAssembler::new(cache, vec![healthy, flaky].into());
    let titles: Vec<_> = assembler
        .assemble()
        .await
        .unwrap()
        .iter()
        .map(|e| e.title().to_string())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Beta"]);
}

#[tokio::test]
async fn test_read_before_first_refresh_is_cache_miss() {
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let assembler = ApplicationAssembler::new(cache, vec![RoundRef::new(10, 9)].into());

    assert!(matches!(
        assembler.assemble().await,
        Err(AssemblyError::CacheMiss(_))
    ));
}

#[tokio::test]
async fn test_status_returns_to_idle() {
    let round = RoundRef::new(10, 9);
    let cache: Arc<dyn KvCache> = Arc::new(MemoryCache::new());
    let source = Arc::new(StubSource::new().with_round(round, vec![]));
    let extractor = Arc::new(StubExtractor::new(features(&[])));
    let orchestrator = orchestrator(cache, source, extractor, &[round], FAST);

    orchestrator.run_cycle().await.unwrap();

    let status = orchestrator.status().await;
    assert_eq!(status.phase, CyclePhase::Idle);
    assert_eq!(status.cycles_completed, 1);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_sqlite_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cache.db");
    let round = RoundRef::new(10, 9);

    {
        let cache: Arc<dyn KvCache> = Arc::new(SqliteCache::open(&db_path).await.unwrap());
        let source = Arc::new(StubSource::new().with_round(round, vec![application(10, 9, "1", "Alpha")]));
        let extractor = Arc::new(StubExtractor::new(features(&["Climate"])));
        orchestrator(cache.clone(), source, extractor, &[round], FAST)
            .run_cycle()
            .await
            .unwrap();
        cache.close().await;
    }

    let cache: Arc<dyn KvCache> = Arc::new(SqliteCache::open(&db_path).await.unwrap());

    let stored: Option<Vec<Application>> = cache.get_json("applications:10:9").await.unwrap();
    assert_eq!(stored.map(|apps| apps.len()), Some(1));
    let cached: Option<Features> = cache
        .get_json("application:10:9:1:features")
        .await
        .unwrap();
    assert!(cached.is_some());

    // A restarted process does not re-extract cached features
    let source = Arc::new(StubSource::new().with_round(round, vec![application(10, 9, "1", "Alpha")]));
    let extractor = Arc::new(StubExtractor::new(features(&["Unused"])));
    let orchestrator = orchestrator(cache.clone(), source, extractor.clone(), &[round], FAST);
    orchestrator.restore_last_report().await;
    assert!(orchestrator.status().await.last_report.is_some());

    orchestrator.run_cycle().await.unwrap();
    assert_eq!(extractor.call_count(), 0);

    cache.close().await;
}
