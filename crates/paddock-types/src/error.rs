use std::fmt;
use std::time::Duration;

use crate::bundle::Provider;

/// Result type for paddock-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building identity values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Session key string could not be parsed
    InvalidKey(String),

    /// Event name normalized to nothing
    InvalidEvent(String),

    /// Alias maps to more than one event in the given season
    AmbiguousEvent {
        season: i32,
        alias: String,
        candidates: Vec<String>,
    },

    /// Unrecognized session type label
    InvalidSessionType(String),

    /// Driver code is not a 2-4 letter abbreviation
    InvalidDriverCode(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKey(msg) => write!(f, "Invalid session key: {}", msg),
            Error::InvalidEvent(raw) => write!(f, "Invalid event name: '{}'", raw),
            Error::AmbiguousEvent {
                season,
                alias,
                candidates,
            } => write!(
                f,
                "Event '{}' is ambiguous in {} (could be: {})",
                alias,
                season,
                candidates.join(", ")
            ),
            Error::InvalidSessionType(raw) => write!(f, "Unknown session type: '{}'", raw),
            Error::InvalidDriverCode(raw) => write!(f, "Invalid driver code: '{}'", raw),
        }
    }
}

impl std::error::Error for Error {}

/// Outcome taxonomy for a single provider fetch.
///
/// `NotFound` is definitive (the provider knows the session does not exist),
/// `Unavailable` and `RateLimited` are transient, `Schema` means the upstream
/// payload no longer matches what the adapter understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    NotFound(String),
    Unavailable(String),
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },
    Schema(String),
}

impl FetchError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        FetchError::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        FetchError::Unavailable(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        FetchError::Schema(msg.into())
    }

    /// Transient failures may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Unavailable(_) | FetchError::RateLimited { .. }
        )
    }

    /// Definitive "no data" answer from the provider
    pub fn is_definitive(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }

    /// Delay the provider asked for, if any
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited {
                retry_after_ms: Some(ms),
                ..
            } => Some(Duration::from_millis(*ms)),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound(msg) => write!(f, "not found: {}", msg),
            FetchError::Unavailable(msg) => write!(f, "unavailable: {}", msg),
            FetchError::RateLimited {
                message,
                retry_after_ms,
            } => match retry_after_ms {
                Some(ms) => write!(f, "rate limited: {} (retry after {}ms)", message, ms),
                None => write!(f, "rate limited: {}", message),
            },
            FetchError::Schema(msg) => write!(f, "schema error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// A fetch error attributed to the provider that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: Provider,
    pub error: FetchError,
}

impl ProviderFailure {
    pub fn new(provider: Provider, error: FetchError) -> Self {
        Self { provider, error }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} provider {}", self.provider, self.error)
    }
}

impl std::error::Error for ProviderFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(FetchError::unavailable("503").is_transient());
        assert!(
            FetchError::RateLimited {
                message: "slow down".to_string(),
                retry_after_ms: None
            }
            .is_transient()
        );
        assert!(!FetchError::not_found("no FP3").is_transient());
        assert!(FetchError::not_found("no FP3").is_definitive());
        assert!(!FetchError::schema("missing laps").is_transient());
    }

    #[test]
    fn test_rate_limit_delay() {
        let err = FetchError::RateLimited {
            message: "429".to_string(),
            retry_after_ms: Some(1500),
        };
        assert_eq!(
            err.suggested_retry_delay(),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(FetchError::unavailable("x").suggested_retry_delay(), None);
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = Error::AmbiguousEvent {
            season: 2020,
            alias: "spielberg".to_string(),
            candidates: vec!["austria".to_string(), "styria".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Event 'spielberg' is ambiguous in 2020 (could be: austria, styria)"
        );
    }
}
