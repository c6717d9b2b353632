use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::key::SessionKey;
use crate::record::{DriverCode, DriverInfo, NormalizedRecord};

/// Upstream data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Deep historical archive with full sector and compound detail
    Rich,
    /// Near-real-time feed, sparse for older seasons
    Live,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Rich => "rich",
            Provider::Live => "live",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    Full,
    PartialLiveOnly,
    PartialRichOnly,
    Empty,
}

impl Completeness {
    /// Derive from which providers returned non-empty data
    pub fn from_contributions(rich: bool, live: bool) -> Self {
        match (rich, live) {
            (true, true) => Completeness::Full,
            (true, false) => Completeness::PartialRichOnly,
            (false, true) => Completeness::PartialLiveOnly,
            (false, false) => Completeness::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Completeness::Empty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Completeness::Full => "full",
            Completeness::PartialLiveOnly => "partial_live_only",
            Completeness::PartialRichOnly => "partial_rich_only",
            Completeness::Empty => "empty",
        }
    }
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which provider(s) contributed a driver's laps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceContribution {
    Rich,
    Live,
    Both,
}

impl SourceContribution {
    pub fn from_sides(rich: bool, live: bool) -> Option<Self> {
        match (rich, live) {
            (true, true) => Some(SourceContribution::Both),
            (true, false) => Some(SourceContribution::Rich),
            (false, true) => Some(SourceContribution::Live),
            (false, false) => None,
        }
    }

    pub fn includes(&self, provider: Provider) -> bool {
        matches!(
            (self, provider),
            (SourceContribution::Both, _)
                | (SourceContribution::Rich, Provider::Rich)
                | (SourceContribution::Live, Provider::Live)
        )
    }
}

/// Field on which providers disagreed beyond tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyField {
    LapTime,
    Sector1,
    Sector2,
    Sector3,
    Compound,
    Position,
}

impl DiscrepancyField {
    pub fn sector(index: usize) -> Self {
        match index {
            0 => DiscrepancyField::Sector1,
            1 => DiscrepancyField::Sector2,
            _ => DiscrepancyField::Sector3,
        }
    }
}

/// A conflict that was resolved in favour of the rich provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub lap_number: u32,
    pub field: DiscrepancyField,
    pub rich: String,
    pub live: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverAttribution {
    pub source: SourceContribution,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discrepancies: Vec<Discrepancy>,
}

/// Reconciled view of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub key: SessionKey,
    /// Sorted driver-major, lap-minor
    pub laps: Vec<NormalizedRecord>,
    pub completeness: Completeness,
    pub source_attribution: BTreeMap<DriverCode, DriverAttribution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roster: Vec<DriverInfo>,
}

impl SessionBundle {
    pub fn empty(key: SessionKey) -> Self {
        Self {
            key,
            laps: Vec::new(),
            completeness: Completeness::Empty,
            source_attribution: BTreeMap::new(),
            roster: Vec::new(),
        }
    }

    pub fn drivers(&self) -> impl Iterator<Item = &DriverCode> {
        self.source_attribution.keys()
    }

    pub fn laps_for<'a>(
        &'a self,
        driver: &'a DriverCode,
    ) -> impl Iterator<Item = &'a NormalizedRecord> + 'a {
        self.laps.iter().filter(move |r| &r.driver == driver)
    }

    pub fn team_of(&self, driver: &DriverCode) -> Option<&str> {
        self.roster
            .iter()
            .find(|d| &d.code == driver)
            .and_then(|d| d.team.as_deref())
    }

    pub fn discrepancy_count(&self) -> usize {
        self.source_attribution
            .values()
            .map(|a| a.discrepancies.len())
            .sum()
    }
}

/// Cached bundle plus bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: SessionKey,
    pub bundle: SessionBundle,
    pub fetched_at: DateTime<Utc>,
    /// Only set for negative (empty) results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
