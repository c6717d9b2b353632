use anyhow::Result;
use owo_colors::OwoColorize;
use paddock_runtime::{CacheOutcome, SessionView};
use paddock_types::{DeltaReference, DiscrepancyField, DriverCode, SourceContribution, Stint};
use serde_json::json;

use super::{parse_driver, parse_key};
use crate::args::OutputFormat;
use crate::context::{ExecutionContext, freshness};
use crate::output::{self, Table, lap_time, mean_delta};

pub async fn handle(
    ctx: &ExecutionContext,
    key: &str,
    refresh: bool,
    reference: Option<&str>,
) -> Result<()> {
    let key = parse_key(key)?;
    let reference = match reference {
        Some(code) => DeltaReference::Driver(parse_driver(code)?),
        None => DeltaReference::SessionFastest,
    };

    let view = ctx
        .paddock()?
        .session(&key, freshness(refresh), reference)
        .await?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({
            "key": view.entry.key,
            "cache": outcome_label(view.outcome),
            "fetched_at": view.entry.fetched_at,
            "bundle": view.entry.bundle,
            "metrics": view.metrics,
        })),
        OutputFormat::Csv => driver_table(&view).print_csv(),
        OutputFormat::Plain => {
            print_plain(&view);
            Ok(())
        }
    }
}

pub(crate) fn outcome_label(outcome: CacheOutcome) -> &'static str {
    match outcome {
        CacheOutcome::Hit => "hit",
        CacheOutcome::Fetched => "fetched",
        CacheOutcome::Coalesced => "coalesced",
    }
}

fn source_label(source: SourceContribution) -> &'static str {
    match source {
        SourceContribution::Rich => "rich",
        SourceContribution::Live => "live",
        SourceContribution::Both => "both",
    }
}

fn field_label(field: DiscrepancyField) -> &'static str {
    match field {
        DiscrepancyField::LapTime => "lap time",
        DiscrepancyField::Sector1 => "sector 1",
        DiscrepancyField::Sector2 => "sector 2",
        DiscrepancyField::Sector3 => "sector 3",
        DiscrepancyField::Compound => "compound",
        DiscrepancyField::Position => "position",
    }
}

/// `M1-40 H41-78`
fn stint_summary(stints: &[Stint]) -> String {
    stints
        .iter()
        .map(|stint| {
            let compound = stint
                .compound
                .map(|c| c.as_str()[..1].to_ascii_uppercase())
                .unwrap_or_else(|| "?".to_string());
            format!("{}{}-{}", compound, stint.start_lap, stint.end_lap)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn finishing_order(view: &SessionView) -> Vec<&DriverCode> {
    let mut drivers: Vec<&DriverCode> = view.entry.bundle.drivers().collect();
    drivers.sort_by_key(|code| {
        let position = view
            .metrics
            .classification
            .get(*code)
            .and_then(|c| c.final_position);
        (position.is_none(), position, (*code).clone())
    });
    drivers
}

fn driver_table(view: &SessionView) -> Table {
    let bundle = &view.entry.bundle;
    let metrics = &view.metrics;

    let mut table = Table::new([
        "pos", "driver", "team", "start", "gained", "best", "delta", "stints", "source",
    ]);
    for code in finishing_order(view) {
        let classification = metrics.classification.get(code);
        let mean = metrics.deltas.get(code).and_then(|deltas| {
            let values: Vec<i64> = deltas.iter().filter_map(|d| d.delta_ms).collect();
            (!values.is_empty()).then(|| values.iter().sum::<i64>() as f64 / values.len() as f64)
        });
        let opt = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();

        table.row([
            opt(classification.and_then(|c| c.final_position)),
            code.to_string(),
            bundle.team_of(code).unwrap_or_default().to_string(),
            opt(classification.and_then(|c| c.start_position)),
            classification
                .and_then(|c| c.positions_gained)
                .map(|g| format!("{:+}", g))
                .unwrap_or_default(),
            lap_time(metrics.fastest_lap.get(code).map(|lap| lap.lap_time_ms)),
            mean_delta(mean),
            metrics
                .stints
                .get(code)
                .map(|s| stint_summary(s))
                .unwrap_or_default(),
            bundle
                .source_attribution
                .get(code)
                .map(|a| source_label(a.source))
                .unwrap_or_default()
                .to_string(),
        ]);
    }
    table
}

fn print_plain(view: &SessionView) {
    let color = output::use_color();
    let bundle = &view.entry.bundle;
    let metrics = &view.metrics;

    let title = format!("{}  [{}]", bundle.key, bundle.completeness);
    if color {
        println!("{}  ({})", title.bold(), outcome_label(view.outcome).dimmed());
    } else {
        println!("{}  ({})", title, outcome_label(view.outcome));
    }

    if bundle.completeness.is_empty() {
        println!("No data from either provider");
        return;
    }

    if let Some(fastest) = &metrics.session_fastest {
        println!(
            "Fastest lap: {} {} (lap {})",
            fastest.driver,
            lap_time(Some(fastest.lap_time_ms)),
            fastest.lap_number
        );
    }
    if let DeltaReference::Driver(code) = &metrics.reference {
        println!("Deltas against {}", code);
    }
    println!();
    print!("{}", driver_table(view).render(color));

    let discrepancies: Vec<_> = bundle
        .source_attribution
        .iter()
        .flat_map(|(code, a)| a.discrepancies.iter().map(move |d| (code, d)))
        .collect();
    if !discrepancies.is_empty() {
        println!("\n{} provider discrepancies (rich value kept):", discrepancies.len());
        for (code, d) in discrepancies {
            println!(
                "  {} lap {} {}: rich {} / live {}",
                code,
                d.lap_number,
                field_label(d.field),
                d.rich,
                d.live
            );
        }
    }
}
