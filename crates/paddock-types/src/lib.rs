pub mod bundle;
pub mod error;
pub mod key;
pub mod record;
pub mod report;
pub mod team;

pub use bundle::*;
pub use error::{Error, FetchError, ProviderFailure, Result};
pub use key::*;
pub use record::*;
pub use report::*;
pub use team::*;
