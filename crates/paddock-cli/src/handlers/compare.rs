use anyhow::Result;
use paddock_types::{DriverComparison, LapRef};

use super::{parse_driver, parse_key};
use crate::args::OutputFormat;
use crate::context::{ExecutionContext, freshness};
use crate::output::{self, Table, lap_time, mean_delta, signed_ms};

pub async fn handle(
    ctx: &ExecutionContext,
    key: &str,
    driver_a: &str,
    driver_b: &str,
    refresh: bool,
) -> Result<()> {
    let key = parse_key(key)?;
    let a = parse_driver(driver_a)?;
    let b = parse_driver(driver_b)?;

    let comparison = ctx
        .paddock()?
        .compare(&key, &a, &b, freshness(refresh))
        .await?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&comparison),
        OutputFormat::Csv => lap_table(&comparison).print_csv(),
        OutputFormat::Plain => {
            print_plain(&comparison);
            Ok(())
        }
    }
}

fn lap_table(comparison: &DriverComparison) -> Table {
    let mut table = Table::new(["lap", "delta", "s1", "s2", "s3"]);
    for lap in &comparison.deltas {
        let [s1, s2, s3] = lap.sector_deltas_ms;
        table.row([
            lap.lap_number.to_string(),
            signed_ms(lap.delta_ms),
            signed_ms(s1),
            signed_ms(s2),
            signed_ms(s3),
        ]);
    }
    table
}

fn fastest(lap: Option<&LapRef>) -> String {
    match lap {
        Some(lap) => format!("{} (lap {})", lap_time(Some(lap.lap_time_ms)), lap.lap_number),
        None => "--".to_string(),
    }
}

fn print_plain(comparison: &DriverComparison) {
    let c = comparison;
    println!("{}: {} vs {}", c.key, c.driver_a, c.driver_b);
    println!("Fastest {}: {}", c.driver_a, fastest(c.fastest_a.as_ref()));
    println!("Fastest {}: {}", c.driver_b, fastest(c.fastest_b.as_ref()));
    let [s1, s2, s3] = c.mean_sector_deltas_ms;
    println!(
        "Mean delta over {} common laps: {} (s1 {}, s2 {}, s3 {})",
        c.common_laps,
        mean_delta(c.mean_delta_ms),
        mean_delta(s1),
        mean_delta(s2),
        mean_delta(s3)
    );
    println!();
    print!("{}", lap_table(c).render(output::use_color()));
}
