//! Raw payload fixtures for directory-backed sources.
//!
//! Writes the native rich (archive) and live (timing feed) payload shapes
//! under `<root>/<season>/<event>/<session>.json`, generated from
//! normalized laps so a round trip through the decoders is predictable.

use anyhow::Result;
use paddock_types::{NormalizedRecord, SessionKey};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One provider's payload directory
pub struct PayloadDir {
    root: PathBuf,
}

impl PayloadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `payload` for the session named by `key` (any accepted key form)
    pub fn write(&self, key: &str, payload: &Value) -> Result<PathBuf> {
        let key: SessionKey = key.parse()?;
        let path = self
            .root
            .join(key.season.to_string())
            .join(key.event.as_str())
            .join(format!("{}.json", key.session_type.slug()));
        fs::create_dir_all(path.parent().unwrap_or(&self.root))?;
        fs::write(&path, serde_json::to_string_pretty(payload)?)?;
        Ok(path)
    }

    /// Write a raw string verbatim (for malformed-payload tests)
    pub fn write_raw(&self, key: &str, body: &str) -> Result<PathBuf> {
        let key: SessionKey = key.parse()?;
        let path = self
            .root
            .join(key.season.to_string())
            .join(key.event.as_str())
            .join(format!("{}.json", key.session_type.slug()));
        fs::create_dir_all(path.parent().unwrap_or(&self.root))?;
        fs::write(&path, body)?;
        Ok(path)
    }

    /// Event running order for `season`
    pub fn write_calendar(&self, season: i32, events: &[&str]) -> Result<()> {
        let dir = self.root.join(season.to_string());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("calendar.json"), serde_json::to_string(events)?)?;
        Ok(())
    }
}

fn seconds(ms: Option<u32>) -> Value {
    match ms {
        Some(ms) => json!(ms as f64 / 1000.0),
        None => Value::Null,
    }
}

fn compound_name(record: &NormalizedRecord) -> Value {
    match record.compound {
        Some(c) => json!(c.as_str().to_uppercase()),
        None => Value::Null,
    }
}

/// Archive-shaped payload: PascalCase laps with float seconds.
///
/// `teams` pairs a driver code with a team name for the `drivers` table.
pub fn rich_payload(laps: &[NormalizedRecord], teams: &[(&str, &str)]) -> Value {
    let laps: Vec<Value> = laps
        .iter()
        .map(|r| {
            json!({
                "Driver": r.driver.as_str(),
                "LapNumber": r.lap_number as f64,
                "LapTime": seconds(r.lap_time_ms),
                "Sector1Time": seconds(r.sector_times_ms[0]),
                "Sector2Time": seconds(r.sector_times_ms[1]),
                "Sector3Time": seconds(r.sector_times_ms[2]),
                "Compound": compound_name(r),
                "Position": r.position.map(|p| p as f64),
                "IsPersonalBest": r.is_personal_best,
            })
        })
        .collect();

    let drivers: Vec<Value> = teams
        .iter()
        .map(|(code, team)| json!({"Abbreviation": code, "TeamName": team}))
        .collect();

    json!({ "laps": laps, "drivers": drivers })
}

/// `HH:MM:SS` offset from a fixed session start
fn session_clock(offset_secs: u32) -> String {
    let total = 12 * 3600 + offset_secs;
    format!(
        "2024-01-01T{:02}:{:02}:{:02}Z",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

/// Feed-shaped payload keyed by car number.
///
/// Cars are numbered by driver code order starting at 1. Compounds become
/// stint rows and positions become samples taken at each lap start.
pub fn live_payload(laps: &[NormalizedRecord], teams: &[(&str, &str)]) -> Value {
    let team_of: BTreeMap<&str, &str> = teams.iter().copied().collect();
    let mut numbers: BTreeMap<&str, u32> = BTreeMap::new();
    for r in laps {
        let next = numbers.len() as u32 + 1;
        numbers.entry(r.driver.as_str()).or_insert(next);
    }
    // Renumber in code order so output is independent of input order
    for (i, number) in numbers.values_mut().enumerate() {
        *number = i as u32 + 1;
    }

    let drivers: Vec<Value> = numbers
        .iter()
        .map(|(code, number)| {
            json!({
                "driver_number": number,
                "name_acronym": code,
                "team_name": team_of.get(code),
            })
        })
        .collect();

    let mut lap_rows = Vec::new();
    let mut positions = Vec::new();
    let mut stints = Vec::new();

    let mut by_driver: BTreeMap<&str, Vec<&NormalizedRecord>> = BTreeMap::new();
    for r in laps {
        by_driver.entry(r.driver.as_str()).or_default().push(r);
    }

    for (code, mut driver_laps) in by_driver {
        let number = numbers[code];
        driver_laps.sort_by_key(|r| r.lap_number);

        for r in &driver_laps {
            let start = session_clock(r.lap_number * 120);
            lap_rows.push(json!({
                "driver_number": number,
                "lap_number": r.lap_number,
                "lap_duration": seconds(r.lap_time_ms),
                "duration_sector_1": seconds(r.sector_times_ms[0]),
                "duration_sector_2": seconds(r.sector_times_ms[1]),
                "duration_sector_3": seconds(r.sector_times_ms[2]),
                "date_start": start,
            }));
            if let Some(position) = r.position {
                positions.push(json!({
                    "driver_number": number,
                    "date": start,
                    "position": position,
                }));
            }
        }

        for run in driver_laps.chunk_by(|a, b| a.compound == b.compound) {
            let (Some(first), Some(last)) = (run.first(), run.last()) else {
                continue;
            };
            if first.compound.is_none() {
                continue;
            }
            stints.push(json!({
                "driver_number": number,
                "lap_start": first.lap_number,
                "lap_end": last.lap_number,
                "compound": compound_name(first),
            }));
        }
    }

    json!({
        "drivers": drivers,
        "laps": lap_rows,
        "stints": stints,
        "positions": positions,
    })
}
