// Session bundle cache: in-memory single-flight map over an optional
// SQLite store keyed by canonical session key

mod cache;
mod error;
mod schema;
mod store;

// Public API
pub use cache::{CacheOutcome, CachePolicy, CacheStats, Freshness, SessionCache};
pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use store::{SqliteStore, StoreStats, checksum};
