use paddock_engine::{MetricsOptions, ReconcileConfig, compute_metrics, reconcile};
use paddock_testing::LapBuilder;
use paddock_types::{
    Completeness, Compound, DeltaReference, DriverCode, FetchError, NormalizedRecord,
    SessionKey, SourceContribution,
};

fn monaco() -> SessionKey {
    "2024-monaco-race".parse().unwrap()
}

fn ver_stint_laps() -> Vec<NormalizedRecord> {
    (1..=78)
        .map(|n| {
            let mut lap = LapBuilder::new("VER", n).compound(if n <= 40 {
                Compound::Medium
            } else {
                Compound::Hard
            });
            // Lap 1 is slow from the standing start, lap 60 has no time
            match n {
                1 => lap = lap.time_ms(90_000),
                60 => {}
                _ => lap = lap.time_ms(75_000 + (n % 7) * 100),
            }
            lap.build()
        })
        .collect()
}

#[test]
fn rich_only_session_reports_rich_attribution_and_fastest_lap() {
    let laps = ver_stint_laps();
    let expected_fastest = laps.iter().filter_map(|l| l.lap_time_ms).min().unwrap();

    let bundle = reconcile(
        &monaco(),
        Ok(laps),
        Err(FetchError::not_found("no live timing")),
        &ReconcileConfig::default(),
    )
    .unwrap();

    let ver = DriverCode::new("VER").unwrap();
    assert_eq!(bundle.completeness, Completeness::PartialRichOnly);
    assert_eq!(bundle.laps.len(), 78);
    assert_eq!(
        bundle.source_attribution[&ver].source,
        SourceContribution::Rich
    );
    assert!(bundle.source_attribution[&ver].discrepancies.is_empty());

    let report = compute_metrics(&bundle, &MetricsOptions::default());
    let fastest = &report.fastest_lap[&ver];
    assert_eq!(fastest.lap_time_ms, expected_fastest);
    // 75_000 first appears on lap 7
    assert_eq!(fastest.lap_number, 7);

    let stints = &report.stints[&ver];
    assert_eq!(stints.len(), 2);
    assert_eq!((stints[0].start_lap, stints[0].end_lap), (1, 40));
    assert_eq!((stints[1].start_lap, stints[1].end_lap), (41, 78));
}

#[test]
fn live_only_session_when_rich_has_nothing() {
    let live = vec![
        LapBuilder::new("NOR", 1).time_ms(76_000).position(2).build(),
        LapBuilder::new("NOR", 2).time_ms(75_500).position(1).build(),
    ];
    let bundle = reconcile(&monaco(), Ok(vec![]), Ok(live), &ReconcileConfig::default()).unwrap();

    assert_eq!(bundle.completeness, Completeness::PartialLiveOnly);
    let report = compute_metrics(&bundle, &MetricsOptions::default());

    insta::assert_json_snapshot!(report.classification, @r#"
    {
      "NOR": {
        "start_position": 2,
        "final_position": 1,
        "positions_gained": 1
      }
    }
    "#);
}

#[test]
fn full_session_merges_and_compares_against_reference_driver() {
    let rich = vec![
        LapBuilder::new("LEC", 1).time_ms(75_000).sectors(20_000, 35_000, 20_000).build(),
        LapBuilder::new("LEC", 2).time_ms(74_800).build(),
        LapBuilder::new("PIA", 1).time_ms(75_400).build(),
    ];
    let live = vec![
        LapBuilder::new("LEC", 1).time_ms(75_001).position(1).build(),
        LapBuilder::new("LEC", 2).time_ms(74_700).position(1).build(),
        LapBuilder::new("PIA", 1).time_ms(75_400).position(2).build(),
        LapBuilder::new("PIA", 2).time_ms(75_100).position(2).build(),
    ];

    let bundle = reconcile(&monaco(), Ok(rich), Ok(live), &ReconcileConfig::default()).unwrap();
    assert_eq!(bundle.completeness, Completeness::Full);
    // Only LEC lap 2 disagrees beyond the 1ms window
    assert_eq!(bundle.discrepancy_count(), 1);

    let lec = DriverCode::new("LEC").unwrap();
    let options = MetricsOptions::default().with_reference(DeltaReference::Driver(lec.clone()));
    let report = compute_metrics(&bundle, &options);

    assert!(!report.deltas.contains_key(&lec));
    let pia = &report.deltas[&DriverCode::new("PIA").unwrap()];
    let deltas: Vec<Option<i64>> = pia.iter().map(|d| d.delta_ms).collect();
    assert_eq!(deltas, vec![Some(400), Some(300)]);
}
