use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use paddock_runtime::{AggregateFilter, AggregateQuery};
use paddock_types::{AggregateReport, AggregateScope, EventId, SessionHighlight, SessionType, TeamId};

use super::calendar::report_gaps;
use super::parse_driver;
use crate::args::{OutputFormat, RangeArgs};
use crate::context::{ExecutionContext, freshness};
use crate::output::{self, Table, lap_time};

pub async fn driver(ctx: &ExecutionContext, code: &str, range: &RangeArgs) -> Result<()> {
    let scope = AggregateScope::Driver(parse_driver(code)?);
    run(ctx, scope, range).await
}

pub async fn team(ctx: &ExecutionContext, name: &str, range: &RangeArgs) -> Result<()> {
    run(ctx, AggregateScope::Team(TeamId::resolve(name)), range).await
}

pub async fn circuit(ctx: &ExecutionContext, event: &str, range: &RangeArgs) -> Result<()> {
    let event = EventId::resolve(range.from, event)
        .with_context(|| format!("unknown event '{}'", event))?;
    run(ctx, AggregateScope::Circuit(event), range).await
}

pub async fn seasons(ctx: &ExecutionContext, range: &RangeArgs) -> Result<()> {
    run(ctx, AggregateScope::SeasonComparison, range).await
}

fn build_filter(range: &RangeArgs) -> Result<AggregateFilter> {
    let session_types = range
        .session_types
        .iter()
        .map(|raw| {
            raw.parse::<SessionType>()
                .with_context(|| format!("unknown session type '{}'", raw))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut filter = AggregateFilter::races(range.from, range.to.unwrap_or(range.from))
        .with_session_types(session_types);
    if let Some(event) = &range.event {
        let event = EventId::resolve(range.from, event)
            .with_context(|| format!("unknown event '{}'", event))?;
        filter = filter.with_event(event);
    }
    Ok(filter)
}

async fn run(ctx: &ExecutionContext, scope: AggregateScope, range: &RangeArgs) -> Result<()> {
    let query = AggregateQuery::new(scope, build_filter(range)?)?;
    let report = ctx
        .paddock()?
        .aggregate(&query, freshness(range.refresh))
        .await;

    match ctx.format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Csv => {
            report_gaps(&report.listing_gaps);
            results_table(&report).print_csv()
        }
        OutputFormat::Plain => {
            report_gaps(&report.listing_gaps);
            print_plain(&report);
            Ok(())
        }
    }
}

fn points(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// One row per in-scope driver per session
fn results_table(report: &AggregateReport) -> Table {
    let mut table = Table::new([
        "season",
        "event",
        "session",
        "driver",
        "team",
        "position",
        "gained",
        "best_lap",
        "points",
        "completeness",
    ]);
    for entry in &report.entries {
        for result in &entry.results {
            table.row([
                entry.key.season.to_string(),
                entry.key.event.to_string(),
                entry.key.session_type.slug().to_string(),
                result.driver.to_string(),
                result.team.clone().unwrap_or_default(),
                result
                    .final_position
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
                result
                    .positions_gained
                    .map(|g| g.to_string())
                    .unwrap_or_default(),
                lap_time(result.fastest_lap_ms),
                points(result.points),
                entry.completeness.to_string(),
            ]);
        }
    }
    table
}

fn highlight(label: &str, h: Option<&SessionHighlight>) {
    let Some(h) = h else {
        return;
    };
    let detail = match (h.position, h.lap_time_ms) {
        (Some(p), _) => format!("P{}", p),
        (None, Some(ms)) => lap_time(Some(ms)),
        (None, None) => String::new(),
    };
    println!("{}: {} {}", label, h.key, detail);
}

fn print_plain(report: &AggregateReport) {
    let color = output::use_color();
    let s = &report.summary;

    let title = report.scope.label();
    if color {
        println!("{}", title.bold());
    } else {
        println!("{}", title);
    }
    println!(
        "{} of {} sessions aggregated ({} failed, {} skipped)",
        s.succeeded, s.requested, s.failed, s.skipped
    );

    match &report.scope {
        AggregateScope::Driver(_) | AggregateScope::Team(_) => {
            println!(
                "Points {}  Wins {}  Podiums {}",
                points(s.points),
                s.wins,
                s.podiums
            );
            highlight("Best", s.best_session.as_ref());
            highlight("Worst", s.worst_session.as_ref());

            let mut seasons = Table::new(["season", "sessions", "points", "wins", "podiums"]);
            for rollup in &s.seasons {
                seasons.row([
                    rollup.season.to_string(),
                    rollup.sessions.to_string(),
                    points(rollup.points),
                    rollup.wins.to_string(),
                    rollup.podiums.to_string(),
                ]);
            }
            println!();
            print!("{}", seasons.render(color));
        }
        AggregateScope::Circuit(_) => {
            highlight("Fastest edition", s.best_session.as_ref());
            highlight("Slowest edition", s.worst_session.as_ref());
        }
        AggregateScope::SeasonComparison => {
            let mut standings = Table::new(["season", "pos", "driver", "team", "points", "wins"]);
            for row in &s.standings {
                standings.row([
                    row.season.to_string(),
                    row.position.to_string(),
                    row.driver.to_string(),
                    row.team.clone().unwrap_or_default(),
                    points(row.points),
                    row.wins.to_string(),
                ]);
            }
            println!();
            print!("{}", standings.render(color));
            return print_skipped(report, color);
        }
    }

    let results = results_table(report);
    if !results.is_empty() {
        println!();
        print!("{}", results.render(color));
    }
    print_skipped(report, color);
}

fn print_skipped(report: &AggregateReport, color: bool) {
    if report.skipped.is_empty() {
        return;
    }
    println!();
    for skip in &report.skipped {
        let line = match &skip.detail {
            Some(detail) => format!("skipped {} ({}): {}", skip.key, skip.reason, detail),
            None => format!("skipped {} ({})", skip.key, skip.reason),
        };
        if color && skip.reason.is_failure() {
            println!("{}", line.yellow());
        } else {
            println!("{}", line);
        }
    }
}
