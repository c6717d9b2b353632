use paddock_types::{DeltaReference, LapRef, MetricsReport, NormalizedRecord, SectorBests, SessionBundle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::delta::compute_deltas;
use crate::positions::{DriverRun, classification, overtakes, position_timeline};
use crate::stints::{DegradationFilter, segment_stints};

/// Caller-controlled inputs to [`compute_metrics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsOptions {
    #[serde(skip)]
    pub reference: DeltaReference,
    pub outlier_factor: f64,
    pub median_window: usize,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            reference: DeltaReference::SessionFastest,
            outlier_factor: 1.10,
            median_window: 5,
        }
    }
}

impl MetricsOptions {
    pub fn with_reference(mut self, reference: DeltaReference) -> Self {
        self.reference = reference;
        self
    }

    fn filter(&self) -> DegradationFilter {
        DegradationFilter {
            outlier_factor: self.outlier_factor,
            median_window: self.median_window,
        }
    }
}

/// Minimum non-null lap time; ties go to the earliest lap, then driver code
pub fn fastest_lap<'a>(laps: impl Iterator<Item = &'a NormalizedRecord>) -> Option<LapRef> {
    laps.filter_map(|r| {
        r.lap_time_ms.map(|t| LapRef {
            driver: r.driver.clone(),
            lap_number: r.lap_number,
            lap_time_ms: t,
        })
    })
    .min_by(|a, b| {
        a.lap_time_ms
            .cmp(&b.lap_time_ms)
            .then(a.lap_number.cmp(&b.lap_number))
            .then_with(|| a.driver.cmp(&b.driver))
    })
}

/// Per-sector minimum, independent of which lap set it
pub fn sector_bests<'a>(laps: impl Iterator<Item = &'a NormalizedRecord>) -> SectorBests {
    let mut sectors_ms: [Option<u32>; 3] = [None; 3];
    for lap in laps {
        for (best, time) in sectors_ms.iter_mut().zip(lap.sector_times_ms) {
            if let Some(t) = time {
                *best = Some(best.map_or(t, |b| b.min(t)));
            }
        }
    }

    let theoretical_best_ms = match sectors_ms {
        [Some(a), Some(b), Some(c)] => a.checked_add(b).and_then(|ab| ab.checked_add(c)),
        _ => None,
    };

    SectorBests {
        sectors_ms,
        theoretical_best_ms,
    }
}

/// Derive the full report for one bundle. Pure; recomputed on every call.
pub fn compute_metrics(bundle: &SessionBundle, options: &MetricsOptions) -> MetricsReport {
    let filter = options.filter();

    let mut fastest = BTreeMap::new();
    let mut sectors = BTreeMap::new();
    let mut stints = BTreeMap::new();
    let mut timelines = BTreeMap::new();
    let mut passes = BTreeMap::new();
    let mut laps_completed = BTreeMap::new();

    for driver in bundle.drivers() {
        let laps: Vec<&NormalizedRecord> = bundle.laps_for(driver).collect();

        if let Some(best) = fastest_lap(laps.iter().copied()) {
            fastest.insert(driver.clone(), best);
        }
        sectors.insert(driver.clone(), sector_bests(laps.iter().copied()));
        stints.insert(driver.clone(), segment_stints(&laps, &filter));

        let timeline = position_timeline(laps.iter().copied());
        passes.insert(driver.clone(), overtakes(&timeline));
        let last_lap = laps.iter().map(|r| r.lap_number).max().unwrap_or(0);
        laps_completed.insert(driver.clone(), last_lap);
        timelines.insert(driver.clone(), timeline);
    }

    let runs: Vec<DriverRun<'_>> = timelines
        .iter()
        .map(|(driver, timeline)| DriverRun {
            driver,
            laps_completed: laps_completed.get(driver).copied().unwrap_or(0),
            timeline: timeline.as_slice(),
        })
        .collect();
    let classified = classification(&runs, bundle.key.session_type.awards_points());

    MetricsReport {
        key: bundle.key.clone(),
        completeness: bundle.completeness,
        reference: options.reference.clone(),
        session_fastest: fastest_lap(bundle.laps.iter()),
        fastest_lap: fastest,
        sector_bests: sectors,
        stints,
        deltas: compute_deltas(bundle, &options.reference),
        position_timeline: timelines,
        overtakes: passes,
        classification: classified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_testing::{BundleBuilder, LapBuilder};
    use paddock_types::DriverCode;

    #[test]
    fn test_fastest_lap_tie_goes_to_earliest_lap() {
        let bundle = BundleBuilder::new("2022-imola-qualifying")
            .lap(LapBuilder::new("LEC", 1).time_ms(78_000))
            .lap(LapBuilder::new("LEC", 4).time_ms(77_500))
            .lap(LapBuilder::new("LEC", 2).time_ms(77_500))
            .lap(LapBuilder::new("SAI", 1).time_ms(77_500))
            .build();

        let report = compute_metrics(&bundle, &MetricsOptions::default());
        let lec = &report.fastest_lap[&DriverCode::new("LEC").unwrap()];
        assert_eq!(lec.lap_number, 2);
        // SAI lap 1 beats LEC lap 2 on lap number
        assert_eq!(report.session_fastest.unwrap().driver.as_str(), "SAI");
    }

    #[test]
    fn test_sector_bests_span_laps() {
        let bundle = BundleBuilder::new("2022-imola-qualifying")
            .lap(LapBuilder::new("LEC", 1).time_ms(78_000).sectors(25_000, 27_000, 26_000))
            .lap(LapBuilder::new("LEC", 2).time_ms(77_900).sectors(25_200, 26_500, 26_200))
            .lap(LapBuilder::new("SAI", 1).time_ms(79_000).sector(0, 25_500))
            .build();

        let report = compute_metrics(&bundle, &MetricsOptions::default());
        let lec = &report.sector_bests[&DriverCode::new("LEC").unwrap()];
        assert_eq!(lec.sectors_ms, [Some(25_000), Some(26_500), Some(26_000)]);
        assert_eq!(lec.theoretical_best_ms, Some(77_500));

        let sai = &report.sector_bests[&DriverCode::new("SAI").unwrap()];
        assert_eq!(sai.theoretical_best_ms, None);
    }

    #[test]
    fn test_oversized_sectors_have_no_theoretical_best() {
        let bundle = BundleBuilder::new("2022-imola-qualifying")
            .lap(LapBuilder::new("LEC", 1).sectors(2_000_000_000, 2_000_000_000, 2_000_000_000))
            .build();

        let report = compute_metrics(&bundle, &MetricsOptions::default());
        let lec = &report.sector_bests[&DriverCode::new("LEC").unwrap()];
        assert_eq!(lec.sectors_ms, [Some(2_000_000_000); 3]);
        assert_eq!(lec.theoretical_best_ms, None);
    }

    #[test]
    fn test_empty_bundle_yields_empty_report() {
        let bundle = BundleBuilder::new("2024-monaco-sprint").build();
        let report = compute_metrics(&bundle, &MetricsOptions::default());
        assert!(report.session_fastest.is_none());
        assert!(report.fastest_lap.is_empty());
        assert!(report.stints.is_empty());
    }
}
