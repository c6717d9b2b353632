use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::bundle::{Completeness, Provider};
use crate::key::{EventId, SessionKey};
use crate::record::{Compound, DriverCode};
use crate::team::TeamId;

// ============================================================================
// Per-session metrics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapRef {
    pub driver: DriverCode,
    pub lap_number: u32,
    pub lap_time_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorBests {
    pub sectors_ms: [Option<u32>; 3],
    /// Sum of the three sector bests, only when all three exist
    pub theoretical_best_ms: Option<u32>,
}

/// Contiguous laps on one compound (a null compound is its own value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stint {
    pub index: u32,
    pub compound: Option<Compound>,
    pub start_lap: u32,
    pub end_lap: u32,
    pub lap_count: u32,
    /// Laps that fed the degradation fit
    pub representative_laps: u32,
    /// Least-squares slope of lap time against lap-in-stint index
    pub degradation_ms_per_lap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "driver", rename_all = "snake_case")]
pub enum DeltaReference {
    #[default]
    SessionFastest,
    Driver(DriverCode),
}

/// Time difference to the reference; `None` when either side is missing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapDelta {
    pub lap_number: u32,
    pub delta_ms: Option<i64>,
    pub sector_deltas_ms: [Option<i64>; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPoint {
    pub lap_number: u32,
    pub position: u32,
}

/// Position improvement between two consecutive recorded laps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overtake {
    pub lap_number: u32,
    pub from_position: u32,
    pub to_position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub start_position: Option<u32>,
    pub final_position: Option<u32>,
    /// Positive when the driver moved forward
    pub positions_gained: Option<i32>,
}

/// Derived statistics for one session; recomputed from the bundle on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub key: SessionKey,
    pub completeness: Completeness,
    pub reference: DeltaReference,
    pub session_fastest: Option<LapRef>,
    pub fastest_lap: BTreeMap<DriverCode, LapRef>,
    pub sector_bests: BTreeMap<DriverCode, SectorBests>,
    pub stints: BTreeMap<DriverCode, Vec<Stint>>,
    pub deltas: BTreeMap<DriverCode, Vec<LapDelta>>,
    pub position_timeline: BTreeMap<DriverCode, Vec<PositionPoint>>,
    pub overtakes: BTreeMap<DriverCode, Vec<Overtake>>,
    pub classification: BTreeMap<DriverCode, Classification>,
}

/// Head-to-head over the laps both drivers completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverComparison {
    pub key: SessionKey,
    pub driver_a: DriverCode,
    pub driver_b: DriverCode,
    pub fastest_a: Option<LapRef>,
    pub fastest_b: Option<LapRef>,
    /// `a - b` per lap number present for either driver
    pub deltas: Vec<LapDelta>,
    pub common_laps: u32,
    pub mean_delta_ms: Option<f64>,
    pub mean_sector_deltas_ms: [Option<f64>; 3],
}

// ============================================================================
// Aggregation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "subject", rename_all = "snake_case")]
pub enum AggregateScope {
    Driver(DriverCode),
    Team(TeamId),
    Circuit(EventId),
    SeasonComparison,
}

impl AggregateScope {
    pub fn label(&self) -> String {
        match self {
            AggregateScope::Driver(code) => format!("driver {}", code),
            AggregateScope::Team(team) => format!("team {}", team),
            AggregateScope::Circuit(event) => format!("circuit {}", event),
            AggregateScope::SeasonComparison => "season comparison".to_string(),
        }
    }
}

/// One driver's outcome in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSessionResult {
    pub driver: DriverCode,
    pub team: Option<String>,
    pub final_position: Option<u32>,
    pub positions_gained: Option<i32>,
    pub fastest_lap_ms: Option<u32>,
    pub holds_session_fastest: bool,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub key: SessionKey,
    pub completeness: Completeness,
    pub session_fastest: Option<LapRef>,
    /// In-scope drivers, ordered by final position then code
    pub results: Vec<DriverSessionResult>,
    pub discrepancies: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Timeout,
    Unavailable,
    RateLimited,
    SchemaError,
    NoData,
    NotParticipating,
}

impl SkipReason {
    /// Failures are retryable or data-quality problems; the rest are
    /// legitimate absences
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SkipReason::Timeout
                | SkipReason::Unavailable
                | SkipReason::RateLimited
                | SkipReason::SchemaError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Timeout => "timeout",
            SkipReason::Unavailable => "unavailable",
            SkipReason::RateLimited => "rate_limited",
            SkipReason::SchemaError => "schema_error",
            SkipReason::NoData => "no_data",
            SkipReason::NotParticipating => "not_participating",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedKey {
    pub key: SessionKey,
    pub reason: SkipReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A season whose session listing could not be obtained from one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingGap {
    pub season: i32,
    pub provider: Provider,
    pub reason: SkipReason,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRollup {
    pub season: i32,
    pub sessions: u32,
    pub points: f64,
    pub wins: u32,
    pub podiums: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub season: i32,
    pub position: u32,
    pub driver: DriverCode,
    pub team: Option<String>,
    pub points: f64,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHighlight {
    pub key: SessionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lap_time_ms: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AggregateSummary {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub wins: u32,
    pub podiums: u32,
    pub points: f64,
    pub best_session: Option<SessionHighlight>,
    pub worst_session: Option<SessionHighlight>,
    pub seasons: Vec<SeasonRollup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standings: Vec<StandingsRow>,
}

/// Result of one aggregate query. Contains no wall-clock data so repeated
/// queries over immutable seasons serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub scope: AggregateScope,
    pub entries: Vec<AggregateEntry>,
    pub skipped: Vec<SkippedKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listing_gaps: Vec<ListingGap>,
    pub summary: AggregateSummary,
}

impl AggregateReport {
    pub fn champion(&self, season: i32) -> Option<&StandingsRow> {
        self.summary
            .standings
            .iter()
            .find(|row| row.season == season && row.position == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_serialization() {
        let scope = AggregateScope::Driver(DriverCode::new("HAM").unwrap());
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, r#"{"kind":"driver","subject":"HAM"}"#);

        let json = serde_json::to_string(&AggregateScope::SeasonComparison).unwrap();
        assert_eq!(json, r#"{"kind":"season_comparison"}"#);
    }

    #[test]
    fn test_skip_reason_classification() {
        assert!(SkipReason::Timeout.is_failure());
        assert!(SkipReason::SchemaError.is_failure());
        assert!(!SkipReason::NoData.is_failure());
        assert!(!SkipReason::NotParticipating.is_failure());
        assert_eq!(
            serde_json::to_string(&SkipReason::RateLimited).unwrap(),
            "\"rate_limited\""
        );
    }

    #[test]
    fn test_delta_reference_default() {
        assert_eq!(DeltaReference::default(), DeltaReference::SessionFastest);
    }
}
