use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the data directory and default configuration")]
    Init,

    #[command(about = "List the sessions of a season across both providers")]
    Calendar { season: i32 },

    #[command(about = "Show the merged driver list for an event")]
    Drivers { season: i32, event: String },

    #[command(about = "Reconcile one session and show its metrics")]
    Session {
        /// Session key, e.g. 2024-monaco-race or 2024-monaco-q
        key: String,

        #[arg(long, help = "Refetch even if cached (in-progress seasons only)")]
        refresh: bool,

        #[arg(long, help = "Compute lap deltas against this driver instead of the session fastest")]
        reference: Option<String>,
    },

    #[command(about = "Head-to-head lap and sector deltas for two drivers")]
    Compare {
        key: String,
        driver_a: String,
        driver_b: String,

        #[arg(long)]
        refresh: bool,
    },

    #[command(about = "Aggregate results across many sessions")]
    Aggregate {
        #[command(subcommand)]
        command: AggregateCommand,
    },

    #[command(about = "Inspect or clear the session cache")]
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
pub enum AggregateCommand {
    #[command(about = "One driver's results")]
    Driver {
        code: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    #[command(about = "Results of every driver who raced for a team")]
    Team {
        name: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    #[command(about = "Every edition of one Grand Prix")]
    Circuit {
        event: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    #[command(about = "Championship standings per season")]
    Seasons {
        #[command(flatten)]
        range: RangeArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    #[arg(long, help = "First season")]
    pub from: i32,

    #[arg(long, help = "Last season (defaults to --from)")]
    pub to: Option<i32>,

    #[arg(
        long = "session-type",
        value_delimiter = ',',
        default_value = "race",
        help = "Session types to include, e.g. race,sprint"
    )]
    pub session_types: Vec<String>,

    #[arg(long, help = "Restrict to one event")]
    pub event: Option<String>,

    #[arg(long)]
    pub refresh: bool,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    #[command(about = "Show cache entry counts")]
    Stats,

    #[command(about = "Drop one cached session")]
    Invalidate { key: String },

    #[command(about = "Delete every cached session")]
    Clear,
}
