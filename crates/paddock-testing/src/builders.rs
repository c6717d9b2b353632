//! Builders for normalized laps and bundles.
//!
//! Test-only code: invalid driver codes or keys panic immediately.

use paddock_types::{
    Completeness, Compound, DriverAttribution, DriverCode, DriverInfo, NormalizedRecord,
    SessionBundle, SessionKey, SourceContribution,
};
use std::collections::BTreeMap;

/// Fluent `NormalizedRecord` construction.
///
/// # Example
/// ```
/// use paddock_testing::LapBuilder;
///
/// let lap = LapBuilder::new("VER", 12).time_ms(74_210).build();
/// assert_eq!(lap.lap_time_ms, Some(74_210));
/// ```
#[derive(Debug, Clone)]
pub struct LapBuilder {
    record: NormalizedRecord,
}

impl LapBuilder {
    pub fn new(driver: &str, lap_number: u32) -> Self {
        let driver = DriverCode::new(driver).expect("valid driver code");
        Self {
            record: NormalizedRecord::new(driver, lap_number),
        }
    }

    pub fn time_ms(mut self, ms: u32) -> Self {
        self.record.lap_time_ms = Some(ms);
        self
    }

    pub fn sectors(mut self, s1: u32, s2: u32, s3: u32) -> Self {
        self.record.sector_times_ms = [Some(s1), Some(s2), Some(s3)];
        self
    }

    pub fn sector(mut self, index: usize, ms: u32) -> Self {
        self.record.sector_times_ms[index] = Some(ms);
        self
    }

    pub fn compound(mut self, compound: Compound) -> Self {
        self.record.compound = Some(compound);
        self
    }

    pub fn position(mut self, position: u32) -> Self {
        self.record.position = Some(position);
        self
    }

    pub fn build(self) -> NormalizedRecord {
        self.record
    }
}

impl From<LapBuilder> for NormalizedRecord {
    fn from(builder: LapBuilder) -> Self {
        builder.build()
    }
}

/// Builds a `SessionBundle` as if it came out of reconciliation.
///
/// Every driver is attributed to `source` (rich by default); completeness
/// follows from that unless set explicitly.
pub struct BundleBuilder {
    key: SessionKey,
    laps: Vec<NormalizedRecord>,
    source: SourceContribution,
    completeness: Option<Completeness>,
    roster: Vec<DriverInfo>,
}

impl BundleBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.parse().expect("valid session key"),
            laps: Vec::new(),
            source: SourceContribution::Rich,
            completeness: None,
            roster: Vec::new(),
        }
    }

    pub fn lap(mut self, lap: impl Into<NormalizedRecord>) -> Self {
        self.laps.push(lap.into());
        self
    }

    pub fn laps(mut self, laps: impl IntoIterator<Item = NormalizedRecord>) -> Self {
        self.laps.extend(laps);
        self
    }

    pub fn source(mut self, source: SourceContribution) -> Self {
        self.source = source;
        self
    }

    pub fn completeness(mut self, completeness: Completeness) -> Self {
        self.completeness = Some(completeness);
        self
    }

    /// Roster entry with a team name
    pub fn driver(mut self, code: &str, team: &str) -> Self {
        self.roster.push(DriverInfo {
            code: DriverCode::new(code).expect("valid driver code"),
            number: None,
            name: None,
            team: Some(team.to_string()),
        });
        self
    }

    pub fn build(mut self) -> SessionBundle {
        self.laps
            .sort_by(|a, b| a.order_key().cmp(&b.order_key()));

        let source_attribution: BTreeMap<DriverCode, DriverAttribution> = self
            .laps
            .iter()
            .map(|r| {
                (
                    r.driver.clone(),
                    DriverAttribution {
                        source: self.source,
                        discrepancies: Vec::new(),
                    },
                )
            })
            .collect();

        let completeness = self.completeness.unwrap_or(if self.laps.is_empty() {
            Completeness::Empty
        } else {
            match self.source {
                SourceContribution::Rich => Completeness::PartialRichOnly,
                SourceContribution::Live => Completeness::PartialLiveOnly,
                SourceContribution::Both => Completeness::Full,
            }
        });

        self.roster.sort_by(|a, b| a.code.cmp(&b.code));

        SessionBundle {
            key: self.key,
            laps: self.laps,
            completeness,
            source_attribution,
            roster: self.roster,
        }
    }
}
