use paddock_types::ProviderFailure;
use std::fmt;

/// Result type for paddock-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Cache or store error
    Cache(paddock_cache::Error),

    /// Provider layer error
    Provider(paddock_providers::Error),

    /// Key, event or driver identity could not be resolved
    Identity(paddock_types::Error),

    /// A session could not be fetched or reconciled
    Session(ProviderFailure),

    /// A single-session request exceeded its time budget
    Timeout { key: String, secs: u64 },

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Aggregate scope or filter rejected before entering the pipeline
    InvalidQuery(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Cache(err) => write!(f, "Cache error: {}", err),
            Error::Provider(err) => write!(f, "Provider error: {}", err),
            Error::Identity(err) => write!(f, "{}", err),
            Error::Session(failure) => write!(f, "Session unavailable: {}", failure),
            Error::Timeout { key, secs } => write!(f, "{} timed out after {}s", key, secs),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Cache(err) => Some(err),
            Error::Provider(err) => Some(err),
            Error::Identity(err) => Some(err),
            Error::Session(failure) => Some(failure),
            Error::Io(err) => Some(err),
            Error::Timeout { .. } | Error::Config(_) | Error::InvalidQuery(_) => None,
        }
    }
}

impl From<paddock_cache::Error> for Error {
    fn from(err: paddock_cache::Error) -> Self {
        Error::Cache(err)
    }
}

impl From<paddock_providers::Error> for Error {
    fn from(err: paddock_providers::Error) -> Self {
        Error::Provider(err)
    }
}

impl From<paddock_types::Error> for Error {
    fn from(err: paddock_types::Error) -> Self {
        Error::Identity(err)
    }
}

impl From<ProviderFailure> for Error {
    fn from(failure: ProviderFailure) -> Self {
        Error::Session(failure)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
