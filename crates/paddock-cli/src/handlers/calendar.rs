use anyhow::Result;
use paddock_types::ListingGap;
use serde_json::json;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output::{self, Table};

pub async fn handle(ctx: &ExecutionContext, season: i32) -> Result<()> {
    let (keys, gaps) = ctx.paddock()?.calendar(season).await;

    let mut table = Table::new(["key", "event", "session"]);
    for key in &keys {
        table.row([
            key.canonical(),
            key.event.to_string(),
            key.session_type.label().to_string(),
        ]);
    }

    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({
            "season": season,
            "sessions": keys,
            "listing_gaps": gaps,
        })),
        OutputFormat::Csv => {
            report_gaps(&gaps);
            table.print_csv()
        }
        OutputFormat::Plain => {
            report_gaps(&gaps);
            if table.is_empty() {
                println!("No sessions found for {}", season);
            } else {
                print!("{}", table.render(output::use_color()));
            }
            Ok(())
        }
    }
}

/// Listing failures go to stderr so stdout stays parseable
pub(crate) fn report_gaps(gaps: &[ListingGap]) {
    for gap in gaps {
        eprintln!(
            "warning: {} listing for {} unavailable ({}): {}",
            gap.provider, gap.season, gap.reason, gap.detail
        );
    }
}
