use chrono::{DateTime, Duration, Utc};
use paddock_types::{Compound, DriverCode, DriverInfo, FetchError, NormalizedRecord, SessionKey};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

use super::schema::{LiveDriver, LiveLap, LivePayload, LivePosition, LiveStint};
use crate::normalize::{duration_ms, finalize, parse_timestamp};
use crate::traits::FetchResult;

fn driver_codes(drivers: &[LiveDriver]) -> HashMap<u32, DriverCode> {
    drivers
        .iter()
        .filter_map(|d| {
            let acronym = d.name_acronym.as_deref()?;
            match DriverCode::new(acronym) {
                Ok(code) => Some((d.driver_number, code)),
                Err(err) => {
                    warn!(number = d.driver_number, error = %err, "ignoring driver entry");
                    None
                }
            }
        })
        .collect()
}

fn compound_for(stints: &[&LiveStint], lap_number: u32) -> Option<Compound> {
    stints
        .iter()
        .find(|s| {
            s.lap_start.is_some_and(|start| start <= lap_number)
                && s.lap_end.is_none_or(|end| lap_number <= end)
        })
        .and_then(|s| s.compound.as_deref())
        .and_then(Compound::parse)
}

/// Latest sample at or before `at`; samples must be sorted by time
fn position_at(samples: &[(DateTime<Utc>, u32)], at: DateTime<Utc>) -> Option<u32> {
    let idx = samples.partition_point(|(ts, _)| *ts <= at);
    idx.checked_sub(1).map(|i| samples[i].1)
}

pub(crate) fn map_laps(key: &SessionKey, payload: LivePayload) -> FetchResult<Vec<NormalizedRecord>> {
    let codes = driver_codes(&payload.drivers);

    let mut stints_by_driver: HashMap<u32, Vec<&LiveStint>> = HashMap::new();
    for stint in &payload.stints {
        stints_by_driver
            .entry(stint.driver_number)
            .or_default()
            .push(stint);
    }

    let mut positions_by_driver: HashMap<u32, Vec<(DateTime<Utc>, u32)>> = HashMap::new();
    for LivePosition {
        driver_number,
        date,
        position,
    } in &payload.positions
    {
        if let Some(ts) = parse_timestamp(date) {
            positions_by_driver
                .entry(*driver_number)
                .or_default()
                .push((ts, *position));
        }
    }
    for samples in positions_by_driver.values_mut() {
        samples.sort_by_key(|(ts, _)| *ts);
    }

    let mut unknown: BTreeSet<u32> = BTreeSet::new();
    let mut by_driver: BTreeMap<(DriverCode, u32), &LiveLap> = BTreeMap::new();
    for lap in &payload.laps {
        let Some(code) = codes.get(&lap.driver_number) else {
            unknown.insert(lap.driver_number);
            continue;
        };
        if lap.lap_number == 0 {
            return Err(FetchError::schema(format!(
                "laps: car {} has lap_number 0",
                lap.driver_number
            )));
        }
        by_driver.entry((code.clone(), lap.lap_number)).or_insert(lap);
    }
    if !unknown.is_empty() {
        warn!(key = %key, cars = ?unknown, "laps for cars missing from driver list skipped");
    }

    let no_stints = Vec::new();
    let no_positions = Vec::new();
    let mut records = Vec::with_capacity(by_driver.len());
    let mut best_so_far: HashMap<DriverCode, u32> = HashMap::new();

    // BTreeMap order is driver then lap, which the running best relies on
    for ((code, lap_number), lap) in by_driver {
        let context = format!("laps[car {} lap {}]", lap.driver_number, lap_number);
        let lap_time_ms = duration_ms(lap.lap_duration, "lap_duration", &context)?;
        let sector_times_ms = [
            duration_ms(lap.duration_sector_1, "duration_sector_1", &context)?,
            duration_ms(lap.duration_sector_2, "duration_sector_2", &context)?,
            duration_ms(lap.duration_sector_3, "duration_sector_3", &context)?,
        ];

        let timestamp = lap.date_start.as_deref().and_then(parse_timestamp);
        let lap_end = timestamp.map(|start| {
            start + Duration::milliseconds(i64::from(lap_time_ms.unwrap_or(0)))
        });
        let samples = positions_by_driver
            .get(&lap.driver_number)
            .unwrap_or(&no_positions);
        let position = lap_end.and_then(|end| position_at(samples, end));

        let stints = stints_by_driver
            .get(&lap.driver_number)
            .unwrap_or(&no_stints);

        let is_personal_best = match lap_time_ms {
            Some(time) => {
                let best = best_so_far.entry(code.clone()).or_insert(u32::MAX);
                if time < *best {
                    *best = time;
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        records.push(NormalizedRecord {
            driver: code,
            lap_number,
            lap_time_ms,
            sector_times_ms,
            compound: compound_for(stints, lap_number),
            position,
            is_personal_best,
            timestamp,
        });
    }

    Ok(finalize(key, "live", records))
}

pub(crate) fn map_roster(drivers: Vec<LiveDriver>) -> Vec<DriverInfo> {
    let codes = driver_codes(&drivers);
    let mut roster: Vec<DriverInfo> = drivers
        .into_iter()
        .filter_map(|d| {
            let code = codes.get(&d.driver_number)?.clone();
            Some(DriverInfo {
                code,
                number: Some(d.driver_number),
                name: d.full_name,
                team: d.team_name,
            })
        })
        .collect();
    roster.sort_by(|a, b| a.code.cmp(&b.code));
    roster.dedup_by(|later, earlier| later.code == earlier.code);
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_position_at_picks_latest_sample() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 26, 13, 0, 0).unwrap();
        let samples = vec![
            (t0, 5),
            (t0 + Duration::seconds(60), 4),
            (t0 + Duration::seconds(120), 3),
        ];
        assert_eq!(position_at(&samples, t0 - Duration::seconds(1)), None);
        assert_eq!(position_at(&samples, t0), Some(5));
        assert_eq!(position_at(&samples, t0 + Duration::seconds(90)), Some(4));
        assert_eq!(position_at(&samples, t0 + Duration::seconds(600)), Some(3));
    }
}
