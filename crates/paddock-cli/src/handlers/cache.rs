use anyhow::Result;
use serde_json::json;

use super::parse_key;
use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output::{self, Table};

pub fn stats(ctx: &ExecutionContext) -> Result<()> {
    let stats = ctx.paddock()?.cache_stats()?;

    let mut table = Table::new(["completeness", "entries"]);
    if let Some(persisted) = &stats.persisted {
        for (completeness, count) in &persisted.by_completeness {
            table.row([completeness.clone(), count.to_string()]);
        }
    }

    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({
            "memory_entries": stats.memory_entries,
            "in_flight": stats.in_flight,
            "persisted": stats.persisted.as_ref().map(|p| json!({
                "total": p.total,
                "by_completeness": p.by_completeness,
            })),
        })),
        OutputFormat::Csv => table.print_csv(),
        OutputFormat::Plain => {
            match &stats.persisted {
                Some(persisted) => {
                    println!("Persisted entries: {}", persisted.total);
                    if !table.is_empty() {
                        print!("{}", table.render(output::use_color()));
                    }
                }
                None => println!("Persistent cache disabled"),
            }
            Ok(())
        }
    }
}

pub fn invalidate(ctx: &ExecutionContext, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    let removed = ctx.paddock()?.invalidate(&key);

    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({ "key": key, "removed": removed })),
        _ if removed => {
            println!("Invalidated {}", key);
            Ok(())
        }
        _ => {
            println!("{} was not cached", key);
            Ok(())
        }
    }
}

pub fn clear(ctx: &ExecutionContext) -> Result<()> {
    let removed = ctx.paddock()?.clear_cache()?;

    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({ "removed": removed })),
        _ => {
            println!("Removed {} cached session(s)", removed);
            Ok(())
        }
    }
}
