use paddock_types::FetchError;
use std::fmt;

/// Result type for paddock-providers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the providers layer
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),

    /// JSON parsing failed
    Json(serde_json::Error),

    /// Provider name not recognized by the registry
    UnknownProvider(String),

    /// Walkdir error
    WalkDir(walkdir::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::UnknownProvider(name) => write!(f, "Unknown provider: {}", name),
            Error::WalkDir(err) => write!(f, "Directory traversal error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::UnknownProvider(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDir(err)
    }
}

/// Map local I/O and decode failures onto the fetch taxonomy
impl From<Error> for FetchError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                FetchError::not_found(io.to_string())
            }
            Error::Io(io) => FetchError::unavailable(io.to_string()),
            Error::WalkDir(walk) => FetchError::unavailable(walk.to_string()),
            Error::Json(json) => FetchError::schema(json.to_string()),
            Error::UnknownProvider(name) => FetchError::schema(format!("unknown provider {}", name)),
        }
    }
}
