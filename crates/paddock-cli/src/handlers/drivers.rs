use anyhow::{Context, Result};
use paddock_types::EventId;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output::{self, Table};

pub async fn handle(ctx: &ExecutionContext, season: i32, event: &str) -> Result<()> {
    let event = EventId::resolve(season, event)
        .with_context(|| format!("unknown event '{}'", event))?;
    let roster = ctx.paddock()?.drivers(season, &event).await?;

    let mut table = Table::new(["code", "number", "name", "team"]);
    for driver in &roster {
        table.row([
            driver.code.to_string(),
            driver.number.map(|n| n.to_string()).unwrap_or_default(),
            driver.name.clone().unwrap_or_default(),
            driver.team.clone().unwrap_or_default(),
        ]);
    }

    match ctx.format {
        OutputFormat::Json => output::print_json(&roster),
        OutputFormat::Csv => table.print_csv(),
        OutputFormat::Plain => {
            print!("{}", table.render(output::use_color()));
            Ok(())
        }
    }
}
