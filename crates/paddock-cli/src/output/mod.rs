mod format;
mod table;

pub use format::{lap_time, mean_delta, signed_ms};
pub use table::Table;

use anyhow::Result;
use is_terminal::IsTerminal;
use serde::Serialize;
use std::io::Write;

/// Colors only on an interactive stdout, and never under `NO_COLOR`
pub fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
