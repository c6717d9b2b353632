use paddock_types::Provider;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, Retrying};
use crate::source::DirectorySource;
use crate::traits::{ProviderAdapter, SourceAdapter};

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub provider: Provider,
    pub name: &'static str,
    pub description: &'static str,
    /// Payload directory relative to the data directory
    pub default_root: &'static str,
}

const PROVIDERS: &[ProviderMetadata] = &[
    ProviderMetadata {
        provider: Provider::Rich,
        name: "rich",
        description: "Historical timing archive (sectors, compounds, deep seasons)",
        default_root: "payloads/rich",
    },
    ProviderMetadata {
        provider: Provider::Live,
        name: "live",
        description: "Live timing feed (recent sessions, sparse history)",
        default_root: "payloads/live",
    },
];

pub fn get_all_providers() -> &'static [ProviderMetadata] {
    PROVIDERS
}

pub fn get_provider_metadata(provider: Provider) -> &'static ProviderMetadata {
    match provider {
        Provider::Rich => &PROVIDERS[0],
        Provider::Live => &PROVIDERS[1],
    }
}

pub fn provider_from_name(name: &str) -> Result<Provider> {
    PROVIDERS
        .iter()
        .find(|p| p.name == name.to_ascii_lowercase())
        .map(|p| p.provider)
        .ok_or_else(|| Error::UnknownProvider(name.to_string()))
}

pub fn expand_home_path(path: &str) -> Option<PathBuf> {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Some(home.join(stripped));
    }
    None
}

/// Explicit root (tilde-expanded) or the provider's default under `data_dir`
pub fn resolve_root(provider: Provider, explicit: Option<&str>, data_dir: &Path) -> PathBuf {
    match explicit {
        Some(path) => expand_home_path(path).unwrap_or_else(|| PathBuf::from(path)),
        None => data_dir.join(get_provider_metadata(provider).default_root),
    }
}

/// Directory-backed adapter for `provider`, wrapped with retries
pub fn create_adapter(
    provider: Provider,
    root: impl Into<PathBuf>,
    policy: RetryPolicy,
) -> Arc<dyn ProviderAdapter> {
    let source = Box::new(DirectorySource::new(root));
    let adapter = match provider {
        Provider::Rich => SourceAdapter::rich(source),
        Provider::Live => SourceAdapter::live(source),
    };
    Arc::new(Retrying::new(adapter, policy))
}
