use futures::future::join_all;
use paddock_cache::Freshness;
use paddock_engine::{MetricsOptions, compute_metrics};
use paddock_types::{
    AggregateEntry, AggregateReport, AggregateScope, AggregateSummary, DriverCode,
    DriverSessionResult, FetchError, ListingGap, MetricsReport, SeasonRollup, SessionBundle,
    SessionHighlight, SessionKey, SkipReason, SkippedKey, StandingsRow, TeamId,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::filter::AggregateQuery;
use crate::pipeline::SessionPipeline;
use crate::points::points_for;

pub(crate) fn skip_reason(err: &FetchError) -> SkipReason {
    match err {
        FetchError::NotFound(_) => SkipReason::NoData,
        FetchError::Unavailable(_) => SkipReason::Unavailable,
        FetchError::RateLimited { .. } => SkipReason::RateLimited,
        FetchError::Schema(_) => SkipReason::SchemaError,
    }
}

/// Bounded-concurrency fan-out over many sessions with per-key timeouts
pub struct HistoricalAggregator {
    pipeline: SessionPipeline,
    metrics: MetricsOptions,
    max_concurrency: usize,
    fetch_timeout: Duration,
}

enum KeyOutcome {
    Entry(AggregateEntry),
    Skipped(SkippedKey),
}

impl HistoricalAggregator {
    pub fn new(
        pipeline: SessionPipeline,
        metrics: MetricsOptions,
        max_concurrency: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            metrics,
            max_concurrency: max_concurrency.max(1),
            fetch_timeout,
        }
    }

    /// Sessions matching the query, ordered season, then event listing
    /// order, then session running order.
    pub async fn resolve_keys(&self, query: &AggregateQuery) -> (Vec<SessionKey>, Vec<ListingGap>) {
        let filter = query.filter();
        let listings =
            join_all(filter.seasons().map(|season| self.pipeline.list_sessions(season))).await;

        let mut keys = Vec::new();
        let mut gaps = Vec::new();
        for (mut season_keys, season_gaps) in listings {
            let mut event_rank: HashMap<_, usize> = HashMap::new();
            for key in &season_keys {
                let next = event_rank.len();
                event_rank.entry(key.event.clone()).or_insert(next);
            }
            season_keys.retain(|k| filter.matches(k));
            season_keys.sort_by_key(|k| (event_rank[&k.event], k.session_type));

            keys.extend(season_keys);
            gaps.extend(season_gaps);
        }
        (keys, gaps)
    }

    pub async fn aggregate(&self, query: &AggregateQuery, freshness: Freshness) -> AggregateReport {
        let (keys, gaps) = self.resolve_keys(query).await;
        self.aggregate_keys(query.scope(), keys, gaps, freshness).await
    }

    /// Aggregate an explicit key list; report order follows `keys`
    pub async fn aggregate_keys(
        &self,
        scope: &AggregateScope,
        keys: Vec<SessionKey>,
        listing_gaps: Vec<ListingGap>,
        freshness: Freshness,
    ) -> AggregateReport {
        info!(scope = %scope.label(), sessions = keys.len(), "aggregate started");
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let requested = keys.len();

        let outcomes = join_all(keys.into_iter().map(|key| {
            let permits = permits.clone();
            async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                self.process_key(scope, key, freshness).await
            }
        }))
        .await;

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                KeyOutcome::Entry(entry) => entries.push(entry),
                KeyOutcome::Skipped(skip) => skipped.push(skip),
            }
        }

        let summary = summarize(scope, requested, &entries, &skipped);
        info!(
            scope = %scope.label(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "aggregate finished"
        );

        AggregateReport {
            scope: scope.clone(),
            entries,
            skipped,
            listing_gaps,
            summary,
        }
    }

    async fn process_key(
        &self,
        scope: &AggregateScope,
        key: SessionKey,
        freshness: Freshness,
    ) -> KeyOutcome {
        let skip = |key: SessionKey, reason: SkipReason, detail: Option<String>| {
            KeyOutcome::Skipped(SkippedKey {
                key,
                reason,
                detail,
            })
        };

        let fetched =
            tokio::time::timeout(self.fetch_timeout, self.pipeline.session(&key, freshness)).await;

        let entry = match fetched {
            Err(_) => {
                warn!(key = %key, timeout = ?self.fetch_timeout, "session fetch timed out");
                return skip(key, SkipReason::Timeout, None);
            }
            Ok(Err(failure)) => {
                warn!(key = %key, error = %failure, "session skipped");
                let reason = skip_reason(&failure.error);
                return skip(key, reason, Some(failure.to_string()));
            }
            Ok(Ok((entry, _))) => entry,
        };

        let bundle = entry.bundle;
        if bundle.completeness.is_empty() {
            debug!(key = %key, "no data for session");
            return skip(key, SkipReason::NoData, None);
        }

        let report = compute_metrics(&bundle, &self.metrics);
        let results = scope_results(scope, &bundle, &report);
        if results.is_empty() {
            let detail = match scope {
                AggregateScope::Team(_) if bundle.roster.is_empty() => {
                    Some("no roster to resolve teams".to_string())
                }
                _ => None,
            };
            return skip(key, SkipReason::NotParticipating, detail);
        }

        KeyOutcome::Entry(AggregateEntry {
            key,
            completeness: bundle.completeness,
            session_fastest: report.session_fastest,
            results,
            discrepancies: bundle.discrepancy_count(),
        })
    }
}

fn driver_result(
    driver: &DriverCode,
    bundle: &SessionBundle,
    report: &MetricsReport,
) -> DriverSessionResult {
    let classification = report.classification.get(driver);
    let final_position = classification.and_then(|c| c.final_position);
    let holds_session_fastest = report
        .session_fastest
        .as_ref()
        .is_some_and(|lap| &lap.driver == driver);

    DriverSessionResult {
        driver: driver.clone(),
        team: bundle.team_of(driver).map(str::to_string),
        final_position,
        positions_gained: classification.and_then(|c| c.positions_gained),
        fastest_lap_ms: report.fastest_lap.get(driver).map(|lap| lap.lap_time_ms),
        holds_session_fastest,
        points: points_for(
            bundle.key.season,
            bundle.key.session_type,
            final_position,
            holds_session_fastest,
        ),
    }
}

fn in_scope(scope: &AggregateScope, driver: &DriverCode, bundle: &SessionBundle) -> bool {
    match scope {
        AggregateScope::Driver(code) => code == driver,
        AggregateScope::Team(team) => bundle
            .team_of(driver)
            .is_some_and(|name| &TeamId::resolve(name) == team),
        AggregateScope::Circuit(_) | AggregateScope::SeasonComparison => true,
    }
}

fn by_position(a: &DriverSessionResult, b: &DriverSessionResult) -> Ordering {
    match (a.final_position, b.final_position) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.driver.cmp(&b.driver))
}

fn scope_results(
    scope: &AggregateScope,
    bundle: &SessionBundle,
    report: &MetricsReport,
) -> Vec<DriverSessionResult> {
    let mut results: Vec<DriverSessionResult> = bundle
        .drivers()
        .filter(|driver| in_scope(scope, driver, bundle))
        .map(|driver| driver_result(driver, bundle, report))
        .collect();
    results.sort_by(by_position);
    results
}

fn tracks_subject(scope: &AggregateScope) -> bool {
    matches!(scope, AggregateScope::Driver(_) | AggregateScope::Team(_))
}

/// Best in-scope finish for the entry, with that result's fastest lap
fn subject_highlight(entry: &AggregateEntry) -> Option<SessionHighlight> {
    let best = entry.results.first()?;
    Some(SessionHighlight {
        key: entry.key.clone(),
        position: best.final_position,
        lap_time_ms: best.fastest_lap_ms,
    })
}

fn circuit_highlight(entry: &AggregateEntry) -> Option<SessionHighlight> {
    let lap = entry.session_fastest.as_ref()?;
    Some(SessionHighlight {
        key: entry.key.clone(),
        position: None,
        lap_time_ms: Some(lap.lap_time_ms),
    })
}

/// First-best and first-worst under `cmp`, keeping report order on ties
fn extremes(
    highlights: Vec<SessionHighlight>,
    cmp: impl Fn(&SessionHighlight, &SessionHighlight) -> Ordering,
) -> (Option<SessionHighlight>, Option<SessionHighlight>) {
    let mut best: Option<SessionHighlight> = None;
    let mut worst: Option<SessionHighlight> = None;
    for h in highlights {
        if best.as_ref().is_none_or(|b| cmp(&h, b) == Ordering::Less) {
            best = Some(h.clone());
        }
        if worst.as_ref().is_none_or(|w| cmp(&h, w) == Ordering::Greater) {
            worst = Some(h);
        }
    }
    (best, worst)
}

fn season_standings(entries: &[AggregateEntry]) -> Vec<StandingsRow> {
    struct Tally {
        points: f64,
        wins: u32,
        team: Option<String>,
    }

    let mut seasons: BTreeMap<i32, BTreeMap<DriverCode, Tally>> = BTreeMap::new();
    for entry in entries {
        let scoring = entry.key.session_type.awards_points();
        let table = seasons.entry(entry.key.season).or_default();
        for result in &entry.results {
            let tally = table.entry(result.driver.clone()).or_insert(Tally {
                points: 0.0,
                wins: 0,
                team: None,
            });
            tally.points += result.points;
            if scoring && result.final_position == Some(1) {
                tally.wins += 1;
            }
            if result.team.is_some() {
                tally.team = result.team.clone();
            }
        }
    }

    let mut rows = Vec::new();
    for (season, table) in seasons {
        let mut ranked: Vec<(DriverCode, Tally)> = table.into_iter().collect();
        ranked.sort_by(|(da, a), (db, b)| {
            b.points
                .total_cmp(&a.points)
                .then(b.wins.cmp(&a.wins))
                .then_with(|| da.cmp(db))
        });
        for (idx, (driver, tally)) in ranked.into_iter().enumerate() {
            rows.push(StandingsRow {
                season,
                position: idx as u32 + 1,
                driver,
                team: tally.team,
                points: tally.points,
                wins: tally.wins,
            });
        }
    }
    rows
}

fn summarize(
    scope: &AggregateScope,
    requested: usize,
    entries: &[AggregateEntry],
    skipped: &[SkippedKey],
) -> AggregateSummary {
    let failed = skipped.iter().filter(|s| s.reason.is_failure()).count();
    let mut summary = AggregateSummary {
        requested,
        succeeded: entries.len(),
        failed,
        skipped: skipped.len() - failed,
        ..AggregateSummary::default()
    };

    let mut rollups: BTreeMap<i32, SeasonRollup> = BTreeMap::new();
    for entry in entries {
        let rollup = rollups.entry(entry.key.season).or_insert(SeasonRollup {
            season: entry.key.season,
            sessions: 0,
            points: 0.0,
            wins: 0,
            podiums: 0,
        });
        rollup.sessions += 1;

        if !tracks_subject(scope) {
            continue;
        }
        let scoring = entry.key.session_type.awards_points();
        for result in &entry.results {
            rollup.points += result.points;
            if scoring {
                match result.final_position {
                    Some(1) => {
                        rollup.wins += 1;
                        rollup.podiums += 1;
                    }
                    Some(2..=3) => rollup.podiums += 1,
                    _ => {}
                }
            }
        }
    }

    for rollup in rollups.values() {
        summary.points += rollup.points;
        summary.wins += rollup.wins;
        summary.podiums += rollup.podiums;
    }
    summary.seasons = rollups.into_values().collect();

    match scope {
        AggregateScope::Driver(_) | AggregateScope::Team(_) => {
            let highlights = entries
                .iter()
                .filter_map(subject_highlight)
                .filter(|h| h.position.is_some())
                .collect();
            (summary.best_session, summary.worst_session) =
                extremes(highlights, |a, b| a.position.cmp(&b.position));
        }
        AggregateScope::Circuit(_) => {
            let highlights = entries.iter().filter_map(circuit_highlight).collect();
            (summary.best_session, summary.worst_session) =
                extremes(highlights, |a, b| a.lap_time_ms.cmp(&b.lap_time_ms));
        }
        AggregateScope::SeasonComparison => {
            summary.standings = season_standings(entries);
        }
    }

    summary
}
