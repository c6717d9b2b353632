use paddock_types::{Classification, DriverCode, NormalizedRecord, Overtake, PositionPoint};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ordered (lap, position) pairs for laps that carry a position
pub fn position_timeline<'a>(
    laps: impl IntoIterator<Item = &'a NormalizedRecord>,
) -> Vec<PositionPoint> {
    let mut points: Vec<PositionPoint> = laps
        .into_iter()
        .filter_map(|r| {
            r.position.map(|position| PositionPoint {
                lap_number: r.lap_number,
                position,
            })
        })
        .collect();
    points.sort_by_key(|p| p.lap_number);
    points
}

/// Every lap where the position number dropped against the previous point
pub fn overtakes(timeline: &[PositionPoint]) -> Vec<Overtake> {
    timeline
        .windows(2)
        .filter(|w| w[1].position < w[0].position)
        .map(|w| Overtake {
            lap_number: w[1].lap_number,
            from_position: w[0].position,
            to_position: w[1].position,
        })
        .collect()
}

/// One driver's input to [`classification`]
#[derive(Debug, Clone, Copy)]
pub struct DriverRun<'a> {
    pub driver: &'a DriverCode,
    /// Highest lap number the driver has any record for
    pub laps_completed: u32,
    pub timeline: &'a [PositionPoint],
}

/// Final order for every driver with at least one recorded position.
///
/// With `by_distance` (races and sprints) drivers who covered more laps rank
/// ahead of those who stopped earlier, so a retired leader cannot keep P1;
/// ties fall back to the last recorded position. Otherwise the last recorded
/// position is the classification.
pub fn classification(
    runs: &[DriverRun<'_>],
    by_distance: bool,
) -> BTreeMap<DriverCode, Classification> {
    let mut ranked: Vec<&DriverRun<'_>> =
        runs.iter().filter(|r| !r.timeline.is_empty()).collect();
    ranked.sort_by(|a, b| {
        let distance = if by_distance {
            b.laps_completed.cmp(&a.laps_completed)
        } else {
            Ordering::Equal
        };
        distance
            .then_with(|| last_position(a).cmp(&last_position(b)))
            .then_with(|| a.driver.cmp(b.driver))
    });

    let mut classified: BTreeMap<DriverCode, Classification> = runs
        .iter()
        .map(|r| (r.driver.clone(), unclassified(r.timeline)))
        .collect();

    for (rank, run) in ranked.into_iter().enumerate() {
        let start_position = run.timeline.first().map(|p| p.position);
        let final_position = if by_distance {
            Some(rank as u32 + 1)
        } else {
            run.timeline.last().map(|p| p.position)
        };
        let positions_gained = match (start_position, final_position) {
            (Some(start), Some(end)) => Some(start as i32 - end as i32),
            _ => None,
        };
        classified.insert(
            run.driver.clone(),
            Classification {
                start_position,
                final_position,
                positions_gained,
            },
        );
    }
    classified
}

fn last_position(run: &DriverRun<'_>) -> Option<u32> {
    run.timeline.last().map(|p| p.position)
}

fn unclassified(timeline: &[PositionPoint]) -> Classification {
    Classification {
        start_position: timeline.first().map(|p| p.position),
        final_position: None,
        positions_gained: None,
    }
}
