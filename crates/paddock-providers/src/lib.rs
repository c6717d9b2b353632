// Error types
pub mod error;

// Trait-based architecture (public API)
pub mod traits;

// Provider payload decoders
pub mod live;
pub mod rich;

// Shared field normalization
mod normalize;

// Raw payload sources
pub mod source;

// Retry/backoff decorator
pub mod retry;

// Provider registry
pub mod registry;

pub use traits::{FetchResult, PayloadDecoder, ProviderAdapter, RawSource, SourceAdapter};

pub use live::LiveDecoder;
pub use rich::RichDecoder;
pub use source::DirectorySource;
pub use retry::{RetryPolicy, Retrying};
pub use registry::{
    create_adapter, get_all_providers, get_provider_metadata, provider_from_name, resolve_root,
};

pub use error::{Error, Result};
