use chrono::{DateTime, Utc};
use paddock_types::{CacheEntry, Completeness};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::schema::init_schema;

/// Row counts per completeness value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub by_completeness: BTreeMap<String, usize>,
}

/// One row per canonical session key, payload stored as checksummed JSON
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

pub fn checksum(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn save(&self, entry: &CacheEntry) -> Result<()> {
        let payload = serde_json::to_string(entry)?;
        let key = entry.key.canonical();

        self.conn().execute(
            r#"
            INSERT INTO cache_entries (key, completeness, fetched_at, expires_at, checksum, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(key) DO UPDATE SET
                completeness = excluded.completeness,
                fetched_at = excluded.fetched_at,
                expires_at = excluded.expires_at,
                checksum = excluded.checksum,
                payload = excluded.payload
            "#,
            params![
                key,
                entry.bundle.completeness.as_str(),
                entry.fetched_at.to_rfc3339(),
                entry.expires_at.map(|t| t.to_rfc3339()),
                checksum(&payload),
                payload,
            ],
        )?;

        Ok(())
    }

    /// `Err(Error::Corruption)` when the row exists but cannot be trusted
    pub fn load(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT checksum, payload FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((stored_checksum, payload)) = row else {
            return Ok(None);
        };

        if checksum(&payload) != stored_checksum {
            return Err(Error::Corruption {
                key: key.to_string(),
                reason: "checksum mismatch".to_string(),
            });
        }

        let entry: CacheEntry = serde_json::from_str(&payload).map_err(|err| Error::Corruption {
            key: key.to_string(),
            reason: err.to_string(),
        })?;

        if entry.key.canonical() != key {
            return Err(Error::Corruption {
                key: key.to_string(),
                reason: format!("payload belongs to {}", entry.key),
            });
        }

        Ok(Some(entry))
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])?;
        Ok(changed > 0)
    }

    pub fn clear(&self) -> Result<usize> {
        let changed = self.conn().execute("DELETE FROM cache_entries", [])?;
        Ok(changed)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key FROM cache_entries ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT completeness, COUNT(*) FROM cache_entries GROUP BY completeness ORDER BY completeness",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stats = StoreStats::default();
        for (completeness, count) in rows {
            let count = count as usize;
            stats.total += count;
            stats.by_completeness.insert(completeness, count);
        }
        Ok(stats)
    }

    /// Drop negative entries whose validity window has passed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let changed = self.conn().execute(
            "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?1 AND completeness = ?2",
            params![now.to_rfc3339(), Completeness::Empty.as_str()],
        )?;
        Ok(changed)
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, key: &str, payload: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE cache_entries SET payload = ?2 WHERE key = ?1",
            params![key, payload],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paddock_types::{SessionBundle, SessionKey};

    fn entry(key: &str) -> CacheEntry {
        let key: SessionKey = key.parse().unwrap();
        CacheEntry {
            key: key.clone(),
            bundle: SessionBundle::empty(key),
            fetched_at: Utc::now(),
            expires_at: None,
        }
    }

    #[test]
    fn test_save_and_load() {
        let store = SqliteStore::open_in_memory().unwrap();
        let saved = entry("2023-monaco-race");
        store.save(&saved).unwrap();

        let loaded = store.load("2023-monaco-race").unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.load("2023-monaco-qualifying").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_single_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&entry("2023-monaco-race")).unwrap();
        store.save(&entry("2023-monaco-race")).unwrap();
        assert_eq!(store.keys().unwrap(), vec!["2023-monaco-race".to_string()]);
    }

    #[test]
    fn test_tampered_payload_is_corruption() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&entry("2023-monaco-race")).unwrap();
        store.tamper("2023-monaco-race", "{\"garbage\":true}").unwrap();

        let err = store.load("2023-monaco-race").unwrap_err();
        assert!(matches!(err, Error::Corruption { .. }));
    }

    #[test]
    fn test_stats_and_clear() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save(&entry("2023-monaco-race")).unwrap();
        store.save(&entry("2023-bahrain-race")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_completeness.get("empty"), Some(&2));

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.stats().unwrap().total, 0);
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
