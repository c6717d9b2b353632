use paddock_types::{
    Completeness, Discrepancy, DiscrepancyField, DriverAttribution, DriverCode, DriverInfo,
    FetchError, NormalizedRecord, Provider, ProviderFailure, SessionBundle, SessionKey,
    SourceContribution,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::{error, info, warn};

pub type SourceResult = std::result::Result<Vec<NormalizedRecord>, FetchError>;

/// Agreement windows for timing fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub lap_tolerance_ms: u32,
    pub sector_tolerance_ms: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            lap_tolerance_ms: 1,
            sector_tolerance_ms: 1,
        }
    }
}

/// Pick the failure that decides the session's fate, if any.
///
/// Schema errors outrank transient ones since retrying cannot fix them.
/// Rich is reported before live when both fail the same way.
fn blocking_failure(rich: &SourceResult, live: &SourceResult) -> Option<ProviderFailure> {
    let sides = [(Provider::Rich, rich), (Provider::Live, live)];

    let schema = sides.iter().find_map(|(provider, result)| match result {
        Err(err @ FetchError::Schema(_)) => Some(ProviderFailure::new(*provider, err.clone())),
        _ => None,
    });
    if schema.is_some() {
        return schema;
    }

    sides.iter().find_map(|(provider, result)| match result {
        Err(err) if err.is_transient() => Some(ProviderFailure::new(*provider, err.clone())),
        _ => None,
    })
}

fn present(result: SourceResult) -> Vec<NormalizedRecord> {
    // NotFound is a structural absence, same as an empty success
    result.unwrap_or_default()
}

struct FieldMerge<'a> {
    lap_number: u32,
    discrepancies: &'a mut Vec<Discrepancy>,
}

impl FieldMerge<'_> {
    fn timing(
        &mut self,
        field: DiscrepancyField,
        rich: Option<u32>,
        live: Option<u32>,
        tolerance: u32,
    ) -> Option<u32> {
        if let (Some(r), Some(l)) = (rich, live)
            && r.abs_diff(l) > tolerance
        {
            self.record(field, r, l);
        }
        rich.or(live)
    }

    fn exact<T: PartialEq + Copy + Display>(
        &mut self,
        field: DiscrepancyField,
        rich: Option<T>,
        live: Option<T>,
    ) -> Option<T> {
        if let (Some(r), Some(l)) = (rich, live)
            && r != l
        {
            self.record(field, r, l);
        }
        rich.or(live)
    }

    fn record(&mut self, field: DiscrepancyField, rich: impl Display, live: impl Display) {
        self.discrepancies.push(Discrepancy {
            lap_number: self.lap_number,
            field,
            rich: rich.to_string(),
            live: live.to_string(),
        });
    }
}

fn merge_lap(
    rich: NormalizedRecord,
    live: NormalizedRecord,
    config: &ReconcileConfig,
    discrepancies: &mut Vec<Discrepancy>,
) -> NormalizedRecord {
    let mut merge = FieldMerge {
        lap_number: rich.lap_number,
        discrepancies,
    };

    let lap_time_ms = merge.timing(
        DiscrepancyField::LapTime,
        rich.lap_time_ms,
        live.lap_time_ms,
        config.lap_tolerance_ms,
    );
    let mut sector_times_ms = [None; 3];
    for (i, slot) in sector_times_ms.iter_mut().enumerate() {
        *slot = merge.timing(
            DiscrepancyField::sector(i),
            rich.sector_times_ms[i],
            live.sector_times_ms[i],
            config.sector_tolerance_ms,
        );
    }
    let compound = merge.exact(DiscrepancyField::Compound, rich.compound, live.compound);
    let position = merge.exact(DiscrepancyField::Position, rich.position, live.position);

    // The personal-best flag follows whichever side supplied the lap time
    let is_personal_best = if rich.lap_time_ms.is_some() {
        rich.is_personal_best
    } else {
        live.is_personal_best
    };

    NormalizedRecord {
        driver: rich.driver,
        lap_number: rich.lap_number,
        lap_time_ms,
        sector_times_ms,
        compound,
        position,
        is_personal_best,
        timestamp: rich.timestamp.or(live.timestamp),
    }
}

/// Merge both providers' outcomes for one session into a single bundle.
///
/// Fails (retryably) when either side failed transiently, and fatally on a
/// schema error; `NotFound` on one or both sides degrades completeness.
pub fn reconcile(
    key: &SessionKey,
    rich: SourceResult,
    live: SourceResult,
    config: &ReconcileConfig,
) -> std::result::Result<SessionBundle, ProviderFailure> {
    if let Some(failure) = blocking_failure(&rich, &live) {
        match failure.error {
            FetchError::Schema(_) => error!(key = %key, provider = %failure.provider, error = %failure.error, "schema error, session rejected"),
            _ => warn!(key = %key, provider = %failure.provider, error = %failure.error, "transient failure, session not reconciled"),
        }
        return Err(failure);
    }

    let rich = present(rich);
    let live = present(live);
    let completeness = Completeness::from_contributions(!rich.is_empty(), !live.is_empty());

    let mut rich_laps: BTreeMap<(DriverCode, u32), NormalizedRecord> = BTreeMap::new();
    for record in rich {
        rich_laps
            .entry((record.driver.clone(), record.lap_number))
            .or_insert(record);
    }
    let mut live_laps: BTreeMap<(DriverCode, u32), NormalizedRecord> = BTreeMap::new();
    for record in live {
        live_laps
            .entry((record.driver.clone(), record.lap_number))
            .or_insert(record);
    }

    let rich_drivers: BTreeSet<DriverCode> = rich_laps.keys().map(|(d, _)| d.clone()).collect();
    let live_drivers: BTreeSet<DriverCode> = live_laps.keys().map(|(d, _)| d.clone()).collect();

    let mut discrepancies: BTreeMap<DriverCode, Vec<Discrepancy>> = BTreeMap::new();
    let mut laps = Vec::with_capacity(rich_laps.len().max(live_laps.len()));

    let all_keys: BTreeSet<(DriverCode, u32)> =
        rich_laps.keys().chain(live_laps.keys()).cloned().collect();
    for lap_key in all_keys {
        let merged = match (rich_laps.remove(&lap_key), live_laps.remove(&lap_key)) {
            (Some(r), Some(l)) => {
                let found = discrepancies.entry(lap_key.0.clone()).or_default();
                merge_lap(r, l, config, found)
            }
            (Some(r), None) => r,
            (None, Some(l)) => l,
            (None, None) => continue,
        };
        laps.push(merged);
    }

    let source_attribution: BTreeMap<DriverCode, DriverAttribution> = rich_drivers
        .union(&live_drivers)
        .filter_map(|driver| {
            let source = SourceContribution::from_sides(
                rich_drivers.contains(driver),
                live_drivers.contains(driver),
            )?;
            Some((
                driver.clone(),
                DriverAttribution {
                    source,
                    discrepancies: discrepancies.remove(driver).unwrap_or_default(),
                },
            ))
        })
        .collect();

    let bundle = SessionBundle {
        key: key.clone(),
        laps,
        completeness,
        source_attribution,
        roster: Vec::new(),
    };

    info!(
        key = %key,
        completeness = %bundle.completeness,
        drivers = bundle.source_attribution.len(),
        laps = bundle.laps.len(),
        discrepancies = bundle.discrepancy_count(),
        "session reconciled"
    );
    Ok(bundle)
}

/// Union of both driver lists, rich entries first with gaps filled from live
pub fn merge_rosters(rich: Vec<DriverInfo>, live: Vec<DriverInfo>) -> Vec<DriverInfo> {
    let mut merged: BTreeMap<DriverCode, DriverInfo> = BTreeMap::new();
    for info in rich {
        merged.entry(info.code.clone()).or_insert(info);
    }
    for info in live {
        match merged.get_mut(&info.code) {
            Some(existing) => {
                existing.number = existing.number.or(info.number);
                existing.name = existing.name.take().or(info.name);
                existing.team = existing.team.take().or(info.team);
            }
            None => {
                merged.insert(info.code.clone(), info);
            }
        }
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::Compound;

    fn key() -> SessionKey {
        "2024-monaco-race".parse().unwrap()
    }

    fn lap(driver: &str, n: u32, ms: Option<u32>) -> NormalizedRecord {
        let mut r = NormalizedRecord::new(DriverCode::new(driver).unwrap(), n);
        r.lap_time_ms = ms;
        r
    }

    #[test]
    fn test_both_not_found_is_empty() {
        let bundle = reconcile(
            &key(),
            Err(FetchError::not_found("rich")),
            Err(FetchError::not_found("live")),
            &ReconcileConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.completeness, Completeness::Empty);
        assert!(bundle.laps.is_empty());
        assert!(bundle.source_attribution.is_empty());
    }

    #[test]
    fn test_rich_only() {
        let bundle = reconcile(
            &key(),
            Ok(vec![lap("VER", 1, Some(75_000)), lap("VER", 2, Some(74_000))]),
            Err(FetchError::not_found("live")),
            &ReconcileConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.completeness, Completeness::PartialRichOnly);
        let ver = &bundle.source_attribution[&DriverCode::new("VER").unwrap()];
        assert_eq!(ver.source, SourceContribution::Rich);
    }

    #[test]
    fn test_live_empty_success_counts_as_absent() {
        let bundle = reconcile(
            &key(),
            Ok(vec![]),
            Ok(vec![lap("NOR", 1, Some(76_000))]),
            &ReconcileConfig::default(),
        )
        .unwrap();
        assert_eq!(bundle.completeness, Completeness::PartialLiveOnly);
    }

    #[test]
    fn test_transient_failure_blocks_partial_bundle() {
        let err = reconcile(
            &key(),
            Ok(vec![lap("VER", 1, Some(75_000))]),
            Err(FetchError::unavailable("503")),
            &ReconcileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.provider, Provider::Live);
        assert!(err.error.is_transient());
    }

    #[test]
    fn test_schema_error_outranks_transient() {
        let err = reconcile(
            &key(),
            Err(FetchError::unavailable("timeout")),
            Err(FetchError::schema("laps missing")),
            &ReconcileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.provider, Provider::Live);
        assert!(matches!(err.error, FetchError::Schema(_)));
    }

    #[test]
    fn test_field_merge_prefers_rich_and_records_conflicts() {
        let mut rich = lap("LEC", 3, Some(74_100));
        rich.sector_times_ms = [Some(19_000), None, Some(20_000)];
        rich.compound = Some(Compound::Medium);

        let mut live = lap("LEC", 3, Some(74_101));
        live.sector_times_ms = [Some(19_050), Some(35_000), Some(20_000)];
        live.compound = Some(Compound::Hard);
        live.position = Some(2);

        let bundle = reconcile(
            &key(),
            Ok(vec![rich]),
            Ok(vec![live]),
            &ReconcileConfig::default(),
        )
        .unwrap();

        assert_eq!(bundle.completeness, Completeness::Full);
        let merged = &bundle.laps[0];
        assert_eq!(merged.lap_time_ms, Some(74_100));
        assert_eq!(merged.sector_times_ms, [Some(19_000), Some(35_000), Some(20_000)]);
        assert_eq!(merged.compound, Some(Compound::Medium));
        assert_eq!(merged.position, Some(2));

        let attribution = &bundle.source_attribution[&DriverCode::new("LEC").unwrap()];
        assert_eq!(attribution.source, SourceContribution::Both);
        let fields: Vec<DiscrepancyField> =
            attribution.discrepancies.iter().map(|d| d.field).collect();
        assert_eq!(
            fields,
            vec![DiscrepancyField::Sector1, DiscrepancyField::Compound]
        );
        assert_eq!(attribution.discrepancies[0].rich, "19000");
        assert_eq!(attribution.discrepancies[0].live, "19050");
    }

    #[test]
    fn test_output_is_sorted() {
        let bundle = reconcile(
            &key(),
            Ok(vec![lap("VER", 2, None), lap("ALO", 1, None)]),
            Ok(vec![lap("VER", 1, None)]),
            &ReconcileConfig::default(),
        )
        .unwrap();
        let order: Vec<(String, u32)> = bundle
            .laps
            .iter()
            .map(|r| (r.driver.to_string(), r.lap_number))
            .collect();
        assert_eq!(
            order,
            vec![
                ("ALO".to_string(), 1),
                ("VER".to_string(), 1),
                ("VER".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_merge_rosters_fills_gaps() {
        let rich = vec![DriverInfo {
            code: DriverCode::new("PIA").unwrap(),
            number: None,
            name: Some("Oscar Piastri".to_string()),
            team: Some("McLaren".to_string()),
        }];
        let live = vec![
            DriverInfo {
                code: DriverCode::new("PIA").unwrap(),
                number: Some(81),
                name: Some("Oscar PIASTRI".to_string()),
                team: None,
            },
            DriverInfo {
                code: DriverCode::new("NOR").unwrap(),
                number: Some(4),
                name: None,
                team: Some("McLaren".to_string()),
            },
        ];

        let merged = merge_rosters(rich, live);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].code.as_str(), "PIA");
        assert_eq!(merged[1].number, Some(81));
        assert_eq!(merged[1].name.as_deref(), Some("Oscar Piastri"));
    }
}
