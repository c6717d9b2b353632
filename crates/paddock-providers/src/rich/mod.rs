mod mapper;
mod schema;

use paddock_types::{DriverInfo, FetchError, NormalizedRecord, Provider, SessionKey};
use serde_json::Value;

use crate::traits::{FetchResult, PayloadDecoder};
use schema::RichPayload;

/// Decoder for the historical archive's lap table export
pub struct RichDecoder;

fn parse_payload(payload: &Value) -> FetchResult<RichPayload> {
    serde_json::from_value(payload.clone())
        .map_err(|err| FetchError::schema(format!("rich payload: {}", err)))
}

impl PayloadDecoder for RichDecoder {
    fn provider(&self) -> Provider {
        Provider::Rich
    }

    fn decode_laps(
        &self,
        key: &SessionKey,
        payload: &Value,
    ) -> FetchResult<Vec<NormalizedRecord>> {
        mapper::map_laps(key, parse_payload(payload)?)
    }

    fn decode_roster(&self, payload: &Value) -> FetchResult<Vec<DriverInfo>> {
        mapper::map_roster(parse_payload(payload)?.drivers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::Compound;
    use serde_json::json;

    fn key() -> SessionKey {
        "2024-monaco-race".parse().unwrap()
    }

    #[test]
    fn test_decode_laps() {
        let payload = json!({
            "laps": [
                {"Driver": "VER", "LapNumber": 2.0, "LapTime": 74.1654, "Sector1Time": 19.5,
                 "Sector2Time": null, "Sector3Time": 20.25, "Compound": "MEDIUM",
                 "Position": 1.0, "IsPersonalBest": true, "LapStartDate": "2024-05-26T13:05:00"},
                {"Driver": "VER", "LapNumber": 1.0, "LapTime": null, "Compound": "TEST_UNKNOWN",
                 "Position": null}
            ],
            "drivers": []
        });

        let laps = RichDecoder.decode_laps(&key(), &payload).unwrap();
        assert_eq!(laps.len(), 2);
        assert_eq!(laps[0].lap_number, 1);
        assert_eq!(laps[0].lap_time_ms, None);
        assert_eq!(laps[0].compound, None);
        assert_eq!(laps[0].position, None);

        assert_eq!(laps[1].lap_time_ms, Some(74165));
        assert_eq!(laps[1].sector_times_ms, [Some(19500), None, Some(20250)]);
        assert_eq!(laps[1].compound, Some(Compound::Medium));
        assert_eq!(laps[1].position, Some(1));
        assert!(laps[1].is_personal_best);
        assert!(laps[1].timestamp.is_some());
    }

    #[test]
    fn test_negative_time_is_schema_error() {
        let payload = json!({"laps": [{"Driver": "HAM", "LapNumber": 1.0, "LapTime": -3.0}]});
        let err = RichDecoder.decode_laps(&key(), &payload).unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
    }

    #[test]
    fn test_missing_laps_is_schema_error() {
        let err = RichDecoder
            .decode_laps(&key(), &json!({"results": []}))
            .unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
    }

    #[test]
    fn test_decode_roster() {
        let payload = json!({
            "laps": [],
            "drivers": [
                {"Abbreviation": "LEC", "DriverNumber": "16", "FirstName": "Charles",
                 "LastName": "Leclerc", "TeamName": "Ferrari"},
                {"Abbreviation": "ALO", "DriverNumber": 14, "TeamName": "Aston Martin"}
            ]
        });

        let roster = RichDecoder.decode_roster(&payload).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].code.as_str(), "ALO");
        assert_eq!(roster[0].number, Some(14));
        assert_eq!(roster[0].name, None);
        assert_eq!(roster[1].name.as_deref(), Some("Charles Leclerc"));
        assert_eq!(roster[1].number, Some(16));
    }
}
