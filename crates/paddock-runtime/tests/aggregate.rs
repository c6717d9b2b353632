use paddock_cache::{CachePolicy, SessionCache};
use paddock_engine::{MetricsOptions, ReconcileConfig};
use paddock_providers::ProviderAdapter;
use paddock_runtime::{
    AggregateFilter, AggregateQuery, Freshness, HistoricalAggregator, SessionPipeline,
};
use paddock_testing::{LapBuilder, ScriptedAdapter};
use paddock_types::{
    AggregateScope, DriverCode, FetchError, NormalizedRecord, Provider, SessionKey, SkipReason,
};
use std::sync::Arc;
use std::time::Duration;

const EVENTS: [&str; 3] = ["bahrain", "monaco", "silverstone"];

fn key(raw: &str) -> SessionKey {
    raw.parse().unwrap()
}

/// Two-lap race where `winner` leads HAM/VER; VER always sets the fastest lap
fn race(winner: &str) -> Vec<NormalizedRecord> {
    let (first, second) = if winner == "HAM" {
        ("HAM", "VER")
    } else {
        ("VER", "HAM")
    };
    let lap_time = |driver: &str, lap: u32| if driver == "VER" { 90_000 + lap } else { 91_000 + lap };
    (1..=2)
        .flat_map(|lap| {
            [
                LapBuilder::new(first, lap).time_ms(lap_time(first, lap)).position(1).build(),
                LapBuilder::new(second, lap).time_ms(lap_time(second, lap)).position(2).build(),
            ]
        })
        .collect()
}

/// HAM wins Bahrain every season and finishes second elsewhere
fn scripted_rich() -> ScriptedAdapter {
    let mut adapter = ScriptedAdapter::new(Provider::Rich);
    for season in 2021..=2023 {
        let keys: Vec<String> = EVENTS
            .iter()
            .map(|event| format!("{}-{}-race", season, event))
            .collect();
        let listed: Vec<&str> = keys.iter().map(String::as_str).collect();
        adapter = adapter.with_sessions(season, &listed);
        for (event, key) in EVENTS.iter().zip(&keys) {
            let winner = if *event == "bahrain" { "HAM" } else { "VER" };
            adapter = adapter.with_laps(key, race(winner));
        }
    }
    adapter
}

fn aggregator(rich: Arc<dyn ProviderAdapter>, timeout: Duration) -> HistoricalAggregator {
    let live: Arc<dyn ProviderAdapter> = Arc::new(ScriptedAdapter::new(Provider::Live));
    let pipeline = SessionPipeline::new(
        Some(rich),
        Some(live),
        SessionCache::in_memory(CachePolicy::default()),
        ReconcileConfig::default(),
    );
    HistoricalAggregator::new(pipeline, MetricsOptions::default(), 4, timeout)
}

fn ham_query() -> AggregateQuery {
    let ham = DriverCode::new("HAM").unwrap();
    AggregateQuery::new(AggregateScope::Driver(ham), AggregateFilter::races(2021, 2023)).unwrap()
}

#[tokio::test]
async fn test_driver_aggregate_skips_timed_out_session() {
    let rich = scripted_rich().with_delay("2022-monaco-race", Duration::from_secs(10));
    let aggregator = aggregator(Arc::new(rich), Duration::from_millis(200));

    let report = aggregator.aggregate(&ham_query(), Freshness::PreferCached).await;

    assert_eq!(report.summary.requested, 9);
    assert_eq!(report.entries.len(), 8);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, key("2022-monaco-race"));
    assert_eq!(report.skipped[0].reason, SkipReason::Timeout);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 0);
    assert!(report.listing_gaps.is_empty());

    // Season, then listing order, regardless of completion order
    let order: Vec<String> = report.entries.iter().map(|e| e.key.canonical()).collect();
    let mut expected = Vec::new();
    for season in 2021..=2023 {
        for event in EVENTS {
            let canonical = key(&format!("{}-{}-race", season, event)).canonical();
            if canonical != key("2022-monaco-race").canonical() {
                expected.push(canonical);
            }
        }
    }
    assert_eq!(order, expected);

    assert_eq!(report.summary.wins, 3);
    assert_eq!(report.summary.podiums, 8);
    assert_eq!(report.summary.points, 165.0);
    let per_season: Vec<(i32, u32, f64)> = report
        .summary
        .seasons
        .iter()
        .map(|s| (s.season, s.sessions, s.points))
        .collect();
    assert_eq!(per_season, vec![(2021, 3, 61.0), (2022, 2, 43.0), (2023, 3, 61.0)]);

    let best = report.summary.best_session.as_ref().unwrap();
    assert_eq!(best.key, key("2021-bahrain-race"));
    assert_eq!(best.position, Some(1));
    let worst = report.summary.worst_session.as_ref().unwrap();
    assert_eq!(worst.key, key("2021-monaco-race"));
}

#[tokio::test]
async fn test_repeated_aggregate_serializes_identically() {
    let rich = Arc::new(scripted_rich());
    let aggregator = aggregator(rich.clone(), Duration::from_secs(5));

    let first = aggregator.aggregate(&ham_query(), Freshness::PreferCached).await;
    let second = aggregator.aggregate(&ham_query(), Freshness::PreferCached).await;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    // Second pass is served from the cache
    assert_eq!(rich.total_fetches(), 9);
}

#[tokio::test]
async fn test_failures_are_classified_per_key() {
    let rich = scripted_rich()
        .with_error("2023-monaco-race", FetchError::schema("LapTime is not a number"))
        .with_error("2023-silverstone-race", FetchError::not_found("no payload"))
        .with_listing_error(2022, FetchError::unavailable("listing 503"));
    let aggregator = aggregator(Arc::new(rich), Duration::from_secs(5));

    let report = aggregator.aggregate(&ham_query(), Freshness::PreferCached).await;

    // 2022 listing is lost entirely
    assert_eq!(report.listing_gaps.len(), 1);
    assert_eq!(report.listing_gaps[0].season, 2022);
    assert_eq!(report.listing_gaps[0].reason, SkipReason::Unavailable);
    assert_eq!(report.summary.requested, 6);

    let reasons: Vec<(String, SkipReason)> = report
        .skipped
        .iter()
        .map(|s| (s.key.canonical(), s.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (key("2023-monaco-race").canonical(), SkipReason::SchemaError),
            (key("2023-silverstone-race").canonical(), SkipReason::NoData),
        ]
    );
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.entries.len(), 4);
}

#[tokio::test]
async fn test_season_comparison_standings() {
    let aggregator = aggregator(Arc::new(scripted_rich()), Duration::from_secs(5));
    let query =
        AggregateQuery::new(AggregateScope::SeasonComparison, AggregateFilter::races(2021, 2021))
            .unwrap();

    let report = aggregator.aggregate(&query, Freshness::PreferCached).await;

    let standings: Vec<(String, f64, u32)> = report
        .summary
        .standings
        .iter()
        .map(|row| (row.driver.to_string(), row.points, row.wins))
        .collect();
    // VER: 18 + 2 x 25 plus the fastest-lap bonus in all three races
    assert_eq!(
        standings,
        vec![("VER".to_string(), 71.0, 2), ("HAM".to_string(), 61.0, 1)]
    );
    assert_eq!(report.champion(2021).map(|row| row.driver.as_str()), Some("VER"));
    assert!(report.summary.best_session.is_none());
    assert_eq!(report.summary.points, 0.0);
}

#[tokio::test]
async fn test_fetches_never_exceed_concurrency_limit() {
    let mut rich = ScriptedAdapter::new(Provider::Rich);
    let keys: Vec<String> = (2017..=2024)
        .map(|season| format!("{}-monaco-race", season))
        .collect();
    for key in &keys {
        let season: i32 = key[..4].parse().unwrap();
        rich = rich
            .with_sessions(season, &[key.as_str()])
            .with_laps(key, race("VER"))
            .with_delay(key, Duration::from_millis(50));
    }
    let rich = Arc::new(rich);

    let live: Arc<dyn ProviderAdapter> = Arc::new(ScriptedAdapter::new(Provider::Live));
    let pipeline = SessionPipeline::new(
        Some(rich.clone()),
        Some(live),
        SessionCache::in_memory(CachePolicy::default()),
        ReconcileConfig::default(),
    );
    let aggregator =
        HistoricalAggregator::new(pipeline, MetricsOptions::default(), 2, Duration::from_secs(5));
    let query = AggregateQuery::new(
        AggregateScope::Driver(DriverCode::new("VER").unwrap()),
        AggregateFilter::races(2017, 2024),
    )
    .unwrap();

    let report = aggregator.aggregate(&query, Freshness::PreferCached).await;

    assert_eq!(rich.total_fetches(), 8);
    assert!(rich.peak_concurrency() <= 2, "peak was {}", rich.peak_concurrency());
    assert_eq!(rich.peak_concurrency(), 2);
    let order: Vec<String> = report.entries.iter().map(|e| e.key.canonical()).collect();
    assert_eq!(order, keys);
}

#[tokio::test]
async fn test_retired_leader_is_not_classified_as_winner() {
    // LEC leads laps 1-2 then retires; VER inherits the lead on lap 3
    let laps = vec![
        LapBuilder::new("LEC", 1).time_ms(91_000).position(1).build(),
        LapBuilder::new("LEC", 2).time_ms(91_000).position(1).build(),
        LapBuilder::new("VER", 1).time_ms(90_000).position(2).build(),
        LapBuilder::new("VER", 2).time_ms(90_000).position(2).build(),
        LapBuilder::new("VER", 3).time_ms(90_000).position(1).build(),
        LapBuilder::new("HAM", 1).time_ms(92_000).position(3).build(),
        LapBuilder::new("HAM", 2).time_ms(92_000).position(3).build(),
        LapBuilder::new("HAM", 3).time_ms(92_000).position(2).build(),
    ];
    let rich = ScriptedAdapter::new(Provider::Rich)
        .with_sessions(2023, &["2023-bahrain-race"])
        .with_laps("2023-bahrain-race", laps);
    let aggregator = aggregator(Arc::new(rich), Duration::from_secs(5));
    let query =
        AggregateQuery::new(AggregateScope::SeasonComparison, AggregateFilter::races(2023, 2023))
            .unwrap();

    let report = aggregator.aggregate(&query, Freshness::PreferCached).await;

    let standings: Vec<(String, f64, u32)> = report
        .summary
        .standings
        .iter()
        .map(|row| (row.driver.to_string(), row.points, row.wins))
        .collect();
    assert_eq!(
        standings,
        vec![
            ("VER".to_string(), 26.0, 1),
            ("HAM".to_string(), 18.0, 0),
            ("LEC".to_string(), 15.0, 0),
        ]
    );
}
