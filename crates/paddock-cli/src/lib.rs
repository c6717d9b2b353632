mod args;
mod commands;
mod context;
mod handlers;
mod logging;
mod output;

pub use args::{AggregateCommand, CacheCommand, Cli, Commands, LogLevel, OutputFormat};
pub use commands::run;
