use paddock_types::{Compound, DriverCode, DriverInfo, FetchError, NormalizedRecord, SessionKey};

use super::schema::{RichDriver, RichLap, RichPayload};
use crate::normalize::{duration_ms, finalize, number_from_value, parse_timestamp, whole_number};
use crate::traits::FetchResult;

pub(crate) fn map_laps(key: &SessionKey, payload: RichPayload) -> FetchResult<Vec<NormalizedRecord>> {
    let records = payload
        .laps
        .into_iter()
        .enumerate()
        .map(|(idx, lap)| map_lap(idx, lap))
        .collect::<FetchResult<Vec<_>>>()?;

    Ok(finalize(key, "rich", records))
}

fn map_lap(idx: usize, lap: RichLap) -> FetchResult<NormalizedRecord> {
    let context = format!("laps[{}]", idx);

    let driver = DriverCode::new(&lap.driver)
        .map_err(|err| FetchError::schema(format!("{}: {}", context, err)))?;
    let lap_number = lap
        .lap_number
        .ok_or_else(|| FetchError::schema(format!("{}: missing LapNumber", context)))
        .and_then(|n| whole_number(n, "LapNumber", &context))?;

    let position = lap
        .position
        .map(|p| whole_number(p, "Position", &context))
        .transpose()?;

    Ok(NormalizedRecord {
        driver,
        lap_number,
        lap_time_ms: duration_ms(lap.lap_time, "LapTime", &context)?,
        sector_times_ms: [
            duration_ms(lap.sector1_time, "Sector1Time", &context)?,
            duration_ms(lap.sector2_time, "Sector2Time", &context)?,
            duration_ms(lap.sector3_time, "Sector3Time", &context)?,
        ],
        compound: lap.compound.as_deref().and_then(Compound::parse),
        position,
        is_personal_best: lap.is_personal_best.unwrap_or(false),
        timestamp: lap.lap_start_date.as_deref().and_then(parse_timestamp),
    })
}

pub(crate) fn map_roster(drivers: Vec<RichDriver>) -> FetchResult<Vec<DriverInfo>> {
    let mut roster = drivers
        .into_iter()
        .map(|driver| {
            let code = DriverCode::new(&driver.abbreviation)
                .map_err(|err| FetchError::schema(format!("drivers: {}", err)))?;
            let name = driver.full_name.or_else(|| {
                match (driver.first_name.as_deref(), driver.last_name.as_deref()) {
                    (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
                    (None, Some(last)) => Some(last.to_string()),
                    (Some(first), None) => Some(first.to_string()),
                    (None, None) => None,
                }
            });
            Ok(DriverInfo {
                code,
                number: driver.driver_number.as_ref().and_then(number_from_value),
                name,
                team: driver.team_name,
            })
        })
        .collect::<FetchResult<Vec<_>>>()?;

    roster.sort_by(|a, b| a.code.cmp(&b.code));
    roster.dedup_by(|later, earlier| later.code == earlier.code);
    Ok(roster)
}
