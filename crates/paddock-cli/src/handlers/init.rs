use anyhow::Result;
use owo_colors::OwoColorize;
use paddock_runtime::{ConfigStatus, Paddock};
use serde_json::json;

use crate::args::OutputFormat;
use crate::context::ExecutionContext;
use crate::output::{self, Table};

pub fn handle(ctx: &ExecutionContext) -> Result<()> {
    let result = Paddock::setup(ctx.data_dir())?;

    let (created, config_path) = match &result.config_status {
        ConfigStatus::Created { config_path } => (true, config_path),
        ConfigStatus::LoadedExisting { config_path } => (false, config_path),
    };

    let mut roots = Table::new(["provider", "enabled", "exists", "root"]);
    for root in &result.payload_roots {
        roots.row([
            root.provider.to_string(),
            root.enabled.to_string(),
            root.exists.to_string(),
            root.root.display().to_string(),
        ]);
    }

    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({
            "data_dir": result.data_dir,
            "config_path": config_path,
            "config_created": created,
            "cache_path": result.cache_path,
            "payload_roots": result.payload_roots.iter().map(|r| json!({
                "provider": r.provider,
                "root": r.root,
                "enabled": r.enabled,
                "exists": r.exists,
            })).collect::<Vec<_>>(),
        })),
        OutputFormat::Csv => roots.print_csv(),
        OutputFormat::Plain => {
            let color = output::use_color();
            let status = if created { "created" } else { "loaded" };
            println!("Data directory: {}", result.data_dir.display());
            println!("Config ({}): {}", status, config_path.display());
            match &result.cache_path {
                Some(path) => println!("Cache: {}", path.display()),
                None => println!("Cache: disabled"),
            }
            println!();
            print!("{}", roots.render(color));

            let missing = result
                .payload_roots
                .iter()
                .filter(|r| r.enabled && !r.exists)
                .count();
            if missing > 0 {
                let hint = format!(
                    "{} enabled provider root(s) do not exist yet; place payloads there or set [providers.<name>].root",
                    missing
                );
                if color {
                    println!("\n{}", hint.yellow());
                } else {
                    println!("\n{}", hint);
                }
            }
            Ok(())
        }
    }
}
