pub mod aggregator;
pub mod config;
pub mod error;
pub mod filter;
pub mod init;
pub mod pipeline;
pub mod points;
pub mod workspace;

pub use aggregator::HistoricalAggregator;
pub use config::{Config, resolve_workspace_path};
pub use error::{Error, Result};
pub use filter::{AggregateFilter, AggregateQuery};
pub use init::{ConfigStatus, InitResult, PayloadRoot};
pub use pipeline::SessionPipeline;
pub use points::points_for;
pub use workspace::{Paddock, SessionView};

// Re-exported so callers need not depend on the cache crate for these
pub use paddock_cache::{CacheOutcome, CacheStats, Freshness};
