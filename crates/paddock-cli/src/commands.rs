use anyhow::{Context, Result};
use paddock_runtime::resolve_workspace_path;

use crate::args::{AggregateCommand, CacheCommand, Cli, Commands};
use crate::context::ExecutionContext;
use crate::handlers;
use crate::logging;

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level);

    let data_dir = resolve_workspace_path(cli.data_dir.as_deref())
        .context("could not resolve a data directory")?;
    tracing::debug!(data_dir = %data_dir.display(), "resolved data directory");
    let ctx = ExecutionContext::new(data_dir, cli.format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(dispatch(&ctx, cli.command))
}

async fn dispatch(ctx: &ExecutionContext, command: Commands) -> Result<()> {
    match command {
        Commands::Init => handlers::init::handle(ctx),

        Commands::Calendar { season } => handlers::calendar::handle(ctx, season).await,

        Commands::Drivers { season, event } => handlers::drivers::handle(ctx, season, &event).await,

        Commands::Session {
            key,
            refresh,
            reference,
        } => handlers::session::handle(ctx, &key, refresh, reference.as_deref()).await,

        Commands::Compare {
            key,
            driver_a,
            driver_b,
            refresh,
        } => handlers::compare::handle(ctx, &key, &driver_a, &driver_b, refresh).await,

        Commands::Aggregate { command } => match command {
            AggregateCommand::Driver { code, range } => {
                handlers::aggregate::driver(ctx, &code, &range).await
            }
            AggregateCommand::Team { name, range } => {
                handlers::aggregate::team(ctx, &name, &range).await
            }
            AggregateCommand::Circuit { event, range } => {
                handlers::aggregate::circuit(ctx, &event, &range).await
            }
            AggregateCommand::Seasons { range } => handlers::aggregate::seasons(ctx, &range).await,
        },

        Commands::Cache { command } => match command {
            CacheCommand::Stats => handlers::cache::stats(ctx),
            CacheCommand::Invalidate { key } => handlers::cache::invalidate(ctx, &key),
            CacheCommand::Clear => handlers::cache::clear(ctx),
        },
    }
}
