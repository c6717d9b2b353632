use paddock_types::{NormalizedRecord, Stint};
use std::collections::HashSet;

use crate::stats::{ols_slope, rolling_median};

/// Knobs for deciding which laps feed the degradation fit
#[derive(Debug, Clone, Copy)]
pub struct DegradationFilter {
    /// A lap slower than `rolling median × factor` is non-representative
    pub outlier_factor: f64,
    pub median_window: usize,
}

/// Lap numbers whose time is anomalously slow against the driver's own
/// rolling median (safety car, pit in/out laps).
fn slow_laps(laps: &[&NormalizedRecord], filter: &DegradationFilter) -> HashSet<u32> {
    let timed: Vec<(u32, u32)> = laps
        .iter()
        .filter_map(|r| r.lap_time_ms.map(|t| (r.lap_number, t)))
        .collect();
    let times: Vec<u32> = timed.iter().map(|(_, t)| *t).collect();
    let medians = rolling_median(&times, filter.median_window);

    timed
        .iter()
        .zip(medians)
        .filter(|((_, time), median)| *time as f64 > median * filter.outlier_factor)
        .map(|((lap, _), _)| *lap)
        .collect()
}

/// Split one driver's laps (sorted by lap number) into maximal runs of
/// consecutive laps on an identical compound and fit a degradation slope to
/// each run. A missing lap number ends the stint.
pub fn segment_stints(laps: &[&NormalizedRecord], filter: &DegradationFilter) -> Vec<Stint> {
    let excluded = slow_laps(laps, filter);
    let mut stints = Vec::new();

    let same_stint = |a: &&NormalizedRecord, b: &&NormalizedRecord| {
        a.compound == b.compound && b.lap_number == a.lap_number + 1
    };
    for run in laps.chunk_by(same_stint) {
        let (Some(first), Some(last)) = (run.first(), run.last()) else {
            continue;
        };

        // First lap of a stint is the out-lap
        let points: Vec<(f64, f64)> = run
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, r)| !excluded.contains(&r.lap_number))
            .filter_map(|(idx, r)| r.lap_time_ms.map(|t| (idx as f64, t as f64)))
            .collect();

        stints.push(Stint {
            index: stints.len() as u32 + 1,
            compound: first.compound,
            start_lap: first.lap_number,
            end_lap: last.lap_number,
            lap_count: run.len() as u32,
            representative_laps: points.len() as u32,
            degradation_ms_per_lap: ols_slope(&points),
        });
    }

    stints
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::{Compound, DriverCode};

    const FILTER: DegradationFilter = DegradationFilter {
        outlier_factor: 1.10,
        median_window: 5,
    };

    fn lap(n: u32, compound: Option<Compound>, ms: Option<u32>) -> NormalizedRecord {
        let mut r = NormalizedRecord::new(DriverCode::new("HAM").unwrap(), n);
        r.compound = compound;
        r.lap_time_ms = ms;
        r
    }

    #[test]
    fn test_compound_runs_become_stints() {
        use Compound::*;
        let compounds = [Soft, Soft, Medium, Medium, Medium, Hard];
        let laps: Vec<NormalizedRecord> = compounds
            .iter()
            .enumerate()
            .map(|(i, c)| lap(i as u32 + 1, Some(*c), Some(80_000)))
            .collect();
        let refs: Vec<&NormalizedRecord> = laps.iter().collect();

        let stints = segment_stints(&refs, &FILTER);
        let lengths: Vec<u32> = stints.iter().map(|s| s.lap_count).collect();
        assert_eq!(lengths, vec![2, 3, 1]);
        assert_eq!(stints[1].start_lap, 3);
        assert_eq!(stints[1].end_lap, 5);
        assert_eq!(stints[2].index, 3);
    }

    #[test]
    fn test_null_compound_is_its_own_stint() {
        let laps = [
            lap(1, Some(Compound::Soft), Some(80_000)),
            lap(2, None, Some(80_000)),
            lap(3, Some(Compound::Soft), Some(80_000)),
        ];
        let refs: Vec<&NormalizedRecord> = laps.iter().collect();
        assert_eq!(segment_stints(&refs, &FILTER).len(), 3);
    }

    #[test]
    fn test_missing_lap_splits_stint() {
        let medium = Some(Compound::Medium);
        let laps = [
            lap(8, medium, Some(80_000)),
            lap(9, medium, Some(80_100)),
            lap(11, medium, Some(80_200)),
            lap(12, medium, Some(80_300)),
        ];
        let refs: Vec<&NormalizedRecord> = laps.iter().collect();

        let stints = segment_stints(&refs, &FILTER);
        let spans: Vec<(u32, u32)> = stints.iter().map(|s| (s.start_lap, s.end_lap)).collect();
        assert_eq!(spans, vec![(8, 9), (11, 12)]);
    }

    #[test]
    fn test_degradation_skips_out_lap_and_slow_laps() {
        let soft = Some(Compound::Soft);
        let laps = [
            lap(1, soft, Some(95_000)),
            lap(2, soft, Some(80_000)),
            lap(3, soft, Some(80_100)),
            lap(4, soft, Some(110_000)),
            lap(5, soft, Some(80_300)),
            lap(6, soft, None),
        ];
        let refs: Vec<&NormalizedRecord> = laps.iter().collect();

        let stints = segment_stints(&refs, &FILTER);
        assert_eq!(stints.len(), 1);
        // Laps 2, 3 and 5 at stint indices 1, 2 and 4
        assert_eq!(stints[0].representative_laps, 3);
        let slope = stints[0].degradation_ms_per_lap.unwrap();
        assert!((slope - 100.0).abs() < 1e-9, "slope was {slope}");
    }

    #[test]
    fn test_short_stint_has_no_slope() {
        let laps = [
            lap(1, Some(Compound::Hard), Some(80_000)),
            lap(2, Some(Compound::Hard), Some(80_500)),
        ];
        let refs: Vec<&NormalizedRecord> = laps.iter().collect();
        let stints = segment_stints(&refs, &FILTER);
        assert_eq!(stints[0].representative_laps, 1);
        assert_eq!(stints[0].degradation_ms_per_lap, None);
    }
}
