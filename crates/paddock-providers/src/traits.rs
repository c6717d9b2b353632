use async_trait::async_trait;
use paddock_types::{DriverInfo, EventId, FetchError, NormalizedRecord, Provider, SessionKey};
use serde_json::Value;
use tracing::{debug, error};

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Raw payload access for one upstream provider
///
/// Responsibilities:
/// - Locate and load the provider's native payload for a session
/// - Enumerate the sessions and events the provider knows about
///
/// Transport and authentication stay behind this trait.
#[async_trait]
pub trait RawSource: Send + Sync {
    /// Short description for logs (e.g. the root directory)
    fn describe(&self) -> String;

    async fn fetch_payload(&self, key: &SessionKey) -> FetchResult<Value>;

    async fn list_sessions(&self, season: i32) -> FetchResult<Vec<SessionKey>>;

    async fn list_events(&self, season: i32) -> FetchResult<Vec<EventId>>;
}

/// Provider-specific payload translation
///
/// Responsibilities:
/// - Decode the native lap shape into `NormalizedRecord`
/// - Decode the native driver list into `DriverInfo`
///
/// No cross-provider reasoning happens here.
pub trait PayloadDecoder: Send + Sync {
    fn provider(&self) -> Provider;

    fn decode_laps(&self, key: &SessionKey, payload: &Value)
    -> FetchResult<Vec<NormalizedRecord>>;

    fn decode_roster(&self, payload: &Value) -> FetchResult<Vec<DriverInfo>>;
}

/// Capability consumed by the pipeline: one provider's normalized view
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_session(&self, key: &SessionKey) -> FetchResult<Vec<NormalizedRecord>>;

    async fn list_sessions(&self, season: i32) -> FetchResult<Vec<SessionKey>>;

    async fn list_drivers(&self, season: i32, event: &EventId) -> FetchResult<Vec<DriverInfo>>;
}

// --- Source-backed adapter ---

/// Adapter that bundles a raw source with the decoder for its payload shape
pub struct SourceAdapter {
    pub source: Box<dyn RawSource>,
    pub decoder: Box<dyn PayloadDecoder>,
}

impl SourceAdapter {
    pub fn new(source: Box<dyn RawSource>, decoder: Box<dyn PayloadDecoder>) -> Self {
        Self { source, decoder }
    }

    /// Rich historical adapter over the given source
    pub fn rich(source: Box<dyn RawSource>) -> Self {
        Self::new(source, Box::new(crate::rich::RichDecoder))
    }

    /// Live timing adapter over the given source
    pub fn live(source: Box<dyn RawSource>) -> Self {
        Self::new(source, Box::new(crate::live::LiveDecoder))
    }

    pub fn id(&self) -> &'static str {
        self.decoder.provider().as_str()
    }
}

#[async_trait]
impl ProviderAdapter for SourceAdapter {
    fn provider(&self) -> Provider {
        self.decoder.provider()
    }

    async fn fetch_session(&self, key: &SessionKey) -> FetchResult<Vec<NormalizedRecord>> {
        debug!(provider = self.id(), key = %key, "fetching session payload");
        let payload = self.source.fetch_payload(key).await?;
        let records = self.decoder.decode_laps(key, &payload).inspect_err(|err| {
            error!(provider = self.id(), key = %key, error = %err, "payload decode failed");
        })?;
        debug!(provider = self.id(), key = %key, laps = records.len(), "session decoded");
        Ok(records)
    }

    async fn list_sessions(&self, season: i32) -> FetchResult<Vec<SessionKey>> {
        self.source.list_sessions(season).await
    }

    /// Roster comes from the latest-running session of the weekend that exists
    async fn list_drivers(&self, season: i32, event: &EventId) -> FetchResult<Vec<DriverInfo>> {
        let mut candidates: Vec<SessionKey> = self
            .source
            .list_sessions(season)
            .await?
            .into_iter()
            .filter(|key| &key.event == event)
            .collect();
        candidates.sort_by_key(|key| std::cmp::Reverse(key.session_type));

        let mut last_err = None;
        for key in candidates {
            match self.source.fetch_payload(&key).await {
                Ok(payload) => {
                    let roster = self.decoder.decode_roster(&payload)?;
                    if !roster.is_empty() {
                        return Ok(roster);
                    }
                }
                Err(err) if err.is_definitive() => continue,
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            FetchError::not_found(format!("no driver list for {} {}", season, event))
        }))
    }
}

