use paddock_types::{
    DeltaReference, DriverCode, DriverComparison, LapDelta, NormalizedRecord, SessionBundle,
};
use std::collections::{BTreeMap, BTreeSet};

use crate::metrics::fastest_lap;
use crate::stats::mean;

fn diff(a: Option<u32>, b: Option<u32>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a as i64 - b as i64),
        _ => None,
    }
}

fn lap_delta(
    lap_number: u32,
    lap: Option<&NormalizedRecord>,
    reference: Option<&NormalizedRecord>,
) -> LapDelta {
    let time = |r: Option<&NormalizedRecord>| r.and_then(|r| r.lap_time_ms);
    let sector = |r: Option<&NormalizedRecord>, i: usize| r.and_then(|r| r.sector_times_ms[i]);

    LapDelta {
        lap_number,
        delta_ms: diff(time(lap), time(reference)),
        sector_deltas_ms: [0, 1, 2].map(|i| diff(sector(lap, i), sector(reference, i))),
    }
}

fn by_lap<'a>(bundle: &'a SessionBundle, driver: &DriverCode) -> BTreeMap<u32, &'a NormalizedRecord> {
    bundle
        .laps
        .iter()
        .filter(|r| &r.driver == driver)
        .map(|r| (r.lap_number, r))
        .collect()
}

/// Per-lap deltas for every driver against `reference`.
///
/// A reference driver is left out of its own series. Laps where either
/// side has no time yield `None`, never zero.
pub fn compute_deltas(
    bundle: &SessionBundle,
    reference: &DeltaReference,
) -> BTreeMap<DriverCode, Vec<LapDelta>> {
    let mut out = BTreeMap::new();

    match reference {
        DeltaReference::SessionFastest => {
            let fastest = fastest_lap(bundle.laps.iter()).and_then(|best| {
                bundle
                    .laps
                    .iter()
                    .find(|r| r.driver == best.driver && r.lap_number == best.lap_number)
            });
            for driver in bundle.drivers() {
                let deltas = bundle
                    .laps_for(driver)
                    .map(|lap| lap_delta(lap.lap_number, Some(lap), fastest))
                    .collect();
                out.insert(driver.clone(), deltas);
            }
        }
        DeltaReference::Driver(ref_driver) => {
            let ref_laps = by_lap(bundle, ref_driver);
            for driver in bundle.drivers().filter(|d| *d != ref_driver) {
                let deltas = bundle
                    .laps_for(driver)
                    .map(|lap| {
                        lap_delta(
                            lap.lap_number,
                            Some(lap),
                            ref_laps.get(&lap.lap_number).copied(),
                        )
                    })
                    .collect();
                out.insert(driver.clone(), deltas);
            }
        }
    }

    out
}

/// Head-to-head of `a` against `b` over every lap number either completed
pub fn compare_drivers(bundle: &SessionBundle, a: &DriverCode, b: &DriverCode) -> DriverComparison {
    let laps_a = by_lap(bundle, a);
    let laps_b = by_lap(bundle, b);
    let lap_numbers: BTreeSet<u32> = laps_a.keys().chain(laps_b.keys()).copied().collect();

    let deltas: Vec<LapDelta> = lap_numbers
        .into_iter()
        .map(|n| lap_delta(n, laps_a.get(&n).copied(), laps_b.get(&n).copied()))
        .collect();

    let lap_values: Vec<i64> = deltas.iter().filter_map(|d| d.delta_ms).collect();
    let mean_sector_deltas_ms = [0, 1, 2].map(|i| {
        let values: Vec<i64> = deltas.iter().filter_map(|d| d.sector_deltas_ms[i]).collect();
        mean(&values)
    });

    DriverComparison {
        key: bundle.key.clone(),
        driver_a: a.clone(),
        driver_b: b.clone(),
        fastest_a: fastest_lap(laps_a.values().copied()),
        fastest_b: fastest_lap(laps_b.values().copied()),
        common_laps: lap_values.len() as u32,
        mean_delta_ms: mean(&lap_values),
        mean_sector_deltas_ms,
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_testing::{BundleBuilder, LapBuilder};

    fn bundle() -> SessionBundle {
        BundleBuilder::new("2023-silverstone-race")
            .lap(LapBuilder::new("VER", 1).time_ms(91_000).sectors(30_000, 31_000, 30_000))
            .lap(LapBuilder::new("VER", 2).time_ms(90_000).sectors(29_500, 30_500, 30_000))
            .lap(LapBuilder::new("NOR", 1).time_ms(91_500).sectors(30_100, 31_200, 30_200))
            .lap(LapBuilder::new("NOR", 2))
            .lap(LapBuilder::new("NOR", 3).time_ms(90_800))
            .build()
    }

    #[test]
    fn test_session_fastest_reference() {
        let deltas = compute_deltas(&bundle(), &DeltaReference::SessionFastest);
        let ver = &deltas[&DriverCode::new("VER").unwrap()];
        assert_eq!(ver[1].delta_ms, Some(0));
        assert_eq!(ver[0].delta_ms, Some(1_000));

        let nor = &deltas[&DriverCode::new("NOR").unwrap()];
        assert_eq!(nor[0].delta_ms, Some(1_500));
        assert_eq!(nor[0].sector_deltas_ms, [Some(600), Some(700), Some(200)]);
        assert_eq!(nor[1].delta_ms, None);
    }

    #[test]
    fn test_driver_reference_excludes_reference() {
        let reference = DeltaReference::Driver(DriverCode::new("VER").unwrap());
        let deltas = compute_deltas(&bundle(), &reference);
        assert!(!deltas.contains_key(&DriverCode::new("VER").unwrap()));

        let nor = &deltas[&DriverCode::new("NOR").unwrap()];
        assert_eq!(nor[0].delta_ms, Some(500));
        // No time on NOR lap 2, no VER lap 3
        assert_eq!(nor[1].delta_ms, None);
        assert_eq!(nor[2].delta_ms, None);
    }

    #[test]
    fn test_compare_drivers() {
        let cmp = compare_drivers(
            &bundle(),
            &DriverCode::new("NOR").unwrap(),
            &DriverCode::new("VER").unwrap(),
        );
        assert_eq!(cmp.deltas.len(), 3);
        assert_eq!(cmp.common_laps, 1);
        assert_eq!(cmp.mean_delta_ms, Some(500.0));
        assert_eq!(cmp.mean_sector_deltas_ms, [Some(100.0), Some(200.0), Some(200.0)]);
        assert_eq!(cmp.fastest_a.unwrap().lap_number, 3);
        assert_eq!(cmp.fastest_b.unwrap().lap_time_ms, 90_000);
    }
}
