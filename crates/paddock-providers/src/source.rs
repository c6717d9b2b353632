use async_trait::async_trait;
use paddock_types::{EventId, FetchError, SessionKey, SessionType};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::traits::{FetchResult, RawSource};

/// Optional per-season file listing event slugs in calendar order
pub const CALENDAR_FILE: &str = "calendar.json";

/// Payload files laid out as `<root>/<season>/<event>/<session>.json`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn payload_path(&self, key: &SessionKey) -> PathBuf {
        self.root
            .join(key.season.to_string())
            .join(key.event.as_str())
            .join(format!("{}.json", key.session_type.slug()))
    }

    fn season_dir(&self, season: i32) -> PathBuf {
        self.root.join(season.to_string())
    }
}

#[async_trait]
impl RawSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn fetch_payload(&self, key: &SessionKey) -> FetchResult<Value> {
        let path = self.payload_path(key);
        let text = tokio::fs::read_to_string(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                FetchError::not_found(format!("{} has no payload for {}", self.describe(), key))
            } else {
                FetchError::unavailable(format!("{}: {}", path.display(), err))
            }
        })?;

        serde_json::from_str(&text)
            .map_err(|err| FetchError::schema(format!("{}: {}", path.display(), err)))
    }

    async fn list_sessions(&self, season: i32) -> FetchResult<Vec<SessionKey>> {
        let season_dir = self.season_dir(season);
        if !season_dir.is_dir() {
            return Err(FetchError::not_found(format!(
                "{} has no season {}",
                self.describe(),
                season
            )));
        }

        let order = self.list_events(season).await?;
        let found = tokio::task::spawn_blocking(move || scan_season(&season_dir, season))
            .await
            .map_err(|err| FetchError::unavailable(err.to_string()))?
            .map_err(FetchError::from)?;

        let mut keys: Vec<SessionKey> = found;
        keys.sort_by_key(|key| {
            let event_rank = order
                .iter()
                .position(|e| e == &key.event)
                .unwrap_or(usize::MAX);
            (event_rank, key.event.clone(), key.session_type)
        });
        Ok(keys)
    }

    async fn list_events(&self, season: i32) -> FetchResult<Vec<EventId>> {
        let season_dir = self.season_dir(season);
        let calendar_path = season_dir.join(CALENDAR_FILE);

        match tokio::fs::read_to_string(&calendar_path).await {
            Ok(text) => return parse_calendar(season, &text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(FetchError::unavailable(format!(
                    "{}: {}",
                    calendar_path.display(),
                    err
                )));
            }
        }

        let mut entries = match tokio::fs::read_dir(&season_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::not_found(format!(
                    "{} has no season {}",
                    self.describe(),
                    season
                )));
            }
            Err(err) => return Err(FetchError::unavailable(err.to_string())),
        };

        let mut events = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| FetchError::unavailable(err.to_string()))?
        {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match EventId::resolve(season, &name) {
                Ok(event) => events.push(event),
                Err(err) => warn!(dir = %name, error = %err, "skipping unrecognized event directory"),
            }
        }
        events.sort();
        events.dedup();
        Ok(events)
    }
}

fn parse_calendar(season: i32, text: &str) -> FetchResult<Vec<EventId>> {
    let names: Vec<String> = serde_json::from_str(text)
        .map_err(|err| FetchError::schema(format!("{}: {}", CALENDAR_FILE, err)))?;

    names
        .iter()
        .map(|name| {
            EventId::resolve(season, name)
                .map_err(|err| FetchError::schema(format!("{}: {}", CALENDAR_FILE, err)))
        })
        .collect()
}

/// Walk one season directory collecting `<event>/<session>.json` files
fn scan_season(season_dir: &Path, season: i32) -> Result<Vec<SessionKey>> {
    let mut keys = Vec::new();

    for entry in WalkDir::new(season_dir).min_depth(2).max_depth(2) {
        let entry = entry.map_err(Error::from)?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(event_name) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        else {
            continue;
        };

        let Ok(session_type) = stem.parse::<SessionType>() else {
            debug!(path = %path.display(), "ignoring non-session file");
            continue;
        };
        match SessionKey::new(season, event_name, session_type) {
            Ok(key) => keys.push(key),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping payload"),
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn test_missing_payload_is_not_found() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path());
        let key: SessionKey = "2024-monaco-race".parse().unwrap();

        let err = source.fetch_payload(&key).await.unwrap_err();
        assert!(err.is_definitive());
    }

    #[tokio::test]
    async fn test_bad_json_is_schema_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2024/monaco/race.json", "{ laps: [");
        let source = DirectorySource::new(dir.path());
        let key: SessionKey = "2024-monaco-race".parse().unwrap();

        let err = source.fetch_payload(&key).await.unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
    }

    #[tokio::test]
    async fn test_list_sessions_follows_calendar() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2024/monaco/race.json", "{}");
        write(dir.path(), "2024/monaco/qualifying.json", "{}");
        write(dir.path(), "2024/bahrain/race.json", "{}");
        write(dir.path(), "2024/bahrain/notes.txt", "");
        write(dir.path(), "2024/calendar.json", r#"["Bahrain", "Monaco"]"#);

        let source = DirectorySource::new(dir.path());
        let keys: Vec<String> = source
            .list_sessions(2024)
            .await
            .unwrap()
            .iter()
            .map(|k| k.canonical())
            .collect();

        assert_eq!(
            keys,
            vec![
                "2024-bahrain-race",
                "2024-monaco-qualifying",
                "2024-monaco-race"
            ]
        );
    }

    #[tokio::test]
    async fn test_list_events_without_calendar_is_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "2023/monaco/race.json", "{}");
        write(dir.path(), "2023/australia/race.json", "{}");

        let source = DirectorySource::new(dir.path());
        let events = source.list_events(2023).await.unwrap();
        let names: Vec<&str> = events.iter().map(|e| e.as_str()).collect();
        assert_eq!(names, vec!["australia", "monaco"]);
    }

    #[tokio::test]
    async fn test_missing_season_is_not_found() {
        let dir = TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(source.list_sessions(1999).await.unwrap_err().is_definitive());
    }
}
