mod mapper;
mod schema;

use paddock_types::{DriverInfo, FetchError, NormalizedRecord, Provider, SessionKey};
use serde_json::Value;

use crate::traits::{FetchResult, PayloadDecoder};
use schema::LivePayload;

/// Decoder for the live timing feed's per-endpoint tables
pub struct LiveDecoder;

fn parse_payload(payload: &Value) -> FetchResult<LivePayload> {
    serde_json::from_value(payload.clone())
        .map_err(|err| FetchError::schema(format!("live payload: {}", err)))
}

impl PayloadDecoder for LiveDecoder {
    fn provider(&self) -> Provider {
        Provider::Live
    }

    fn decode_laps(
        &self,
        key: &SessionKey,
        payload: &Value,
    ) -> FetchResult<Vec<NormalizedRecord>> {
        mapper::map_laps(key, parse_payload(payload)?)
    }

    fn decode_roster(&self, payload: &Value) -> FetchResult<Vec<DriverInfo>> {
        Ok(mapper::map_roster(parse_payload(payload)?.drivers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::Compound;
    use serde_json::json;

    fn key() -> SessionKey {
        "2024-bahrain-race".parse().unwrap()
    }

    fn payload() -> Value {
        json!({
            "drivers": [
                {"driver_number": 1, "name_acronym": "VER", "full_name": "Max VERSTAPPEN",
                 "team_name": "Red Bull Racing"},
                {"driver_number": 16, "name_acronym": "LEC", "team_name": "Ferrari"}
            ],
            "laps": [
                {"driver_number": 1, "lap_number": 1, "lap_duration": 97.284,
                 "duration_sector_1": null, "duration_sector_2": 42.1, "duration_sector_3": 22.0,
                 "date_start": "2024-03-02T15:03:00Z"},
                {"driver_number": 1, "lap_number": 2, "lap_duration": 96.5,
                 "date_start": "2024-03-02T15:04:37.284Z"},
                {"driver_number": 1, "lap_number": 3, "lap_duration": 96.9,
                 "date_start": "2024-03-02T15:06:13.784Z"},
                {"driver_number": 16, "lap_number": 1, "lap_duration": 98.0,
                 "date_start": "2024-03-02T15:03:01Z"},
                {"driver_number": 99, "lap_number": 1, "lap_duration": 99.0}
            ],
            "stints": [
                {"driver_number": 1, "stint_number": 1, "lap_start": 1, "lap_end": 2, "compound": "SOFT"},
                {"driver_number": 1, "stint_number": 2, "lap_start": 3, "lap_end": null, "compound": "HARD"},
                {"driver_number": 16, "stint_number": 1, "lap_start": 1, "lap_end": 20, "compound": "UNKNOWN"}
            ],
            "positions": [
                {"driver_number": 1, "date": "2024-03-02T15:02:00Z", "position": 1},
                {"driver_number": 16, "date": "2024-03-02T15:02:00Z", "position": 2},
                {"driver_number": 16, "date": "2024-03-02T15:04:00Z", "position": 1},
                {"driver_number": 1, "date": "2024-03-02T15:04:00Z", "position": 2}
            ]
        })
    }

    #[test]
    fn test_joins_stints_positions_and_best() {
        let laps = LiveDecoder.decode_laps(&key(), &payload()).unwrap();
        let ver: Vec<_> = laps.iter().filter(|r| r.driver.as_str() == "VER").collect();
        assert_eq!(ver.len(), 3);

        assert_eq!(ver[0].lap_time_ms, Some(97284));
        assert_eq!(ver[0].sector_times_ms, [None, Some(42100), Some(22000)]);
        assert_eq!(ver[0].compound, Some(Compound::Soft));
        assert_eq!(ver[2].compound, Some(Compound::Hard));

        // Lap 1 ends 15:04:37, after the 15:04:00 sample
        assert_eq!(ver[0].position, Some(2));

        assert!(ver[0].is_personal_best);
        assert!(ver[1].is_personal_best);
        assert!(!ver[2].is_personal_best);
    }

    #[test]
    fn test_unknown_compound_and_car() {
        let laps = LiveDecoder.decode_laps(&key(), &payload()).unwrap();
        let lec: Vec<_> = laps.iter().filter(|r| r.driver.as_str() == "LEC").collect();
        assert_eq!(lec.len(), 1);
        assert_eq!(lec[0].compound, None);
        assert_eq!(laps.len(), 4);
    }

    #[test]
    fn test_roster() {
        let roster = LiveDecoder.decode_roster(&payload()).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].code.as_str(), "LEC");
        assert_eq!(roster[0].number, Some(16));
        assert_eq!(roster[1].team.as_deref(), Some("Red Bull Racing"));
    }

    #[test]
    fn test_negative_duration_is_schema_error() {
        let bad = json!({
            "drivers": [{"driver_number": 44, "name_acronym": "HAM"}],
            "laps": [{"driver_number": 44, "lap_number": 1, "lap_duration": -1.0}]
        });
        assert!(matches!(
            LiveDecoder.decode_laps(&key(), &bad),
            Err(FetchError::Schema(_))
        ));
    }
}
