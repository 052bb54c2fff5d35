//! Overlay cache
//!
//! Short-lived, per-district cache of live overlay payloads. Keys are
//! order-independent over the district's seat ids. Each entry records the
//! cycle year it was fetched for and is only served for that year. An entry
//! at or past the TTL is never served. Storage failures are logged and read as
//! [`CacheRead::Unavailable`]; they never reach the caller as errors.

use crate::errors::{Result, SeatwatchError};
use crate::live::LivePayload;
use crate::model::SeatId;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CACHE_KEY_PREFIX: &str = "live_overlay:";

/// Cache key for a district: prefix + sorted, deduplicated, comma-joined ids
pub fn overlay_cache_key(seat_ids: &[SeatId]) -> String {
    let mut ids = seat_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    let joined = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("{CACHE_KEY_PREFIX}{joined}")
}

/// Raw key/value storage behind the cache. Last write to a key wins.
pub trait OverlayStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Session-scoped in-memory store with an optional entry quota
#[derive(Default)]
pub struct MemoryOverlayStore {
    entries: Mutex<HashMap<String, String>>,
    max_entries: Option<usize>,
}

impl MemoryOverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject new keys once `max_entries` distinct keys are stored
    pub fn with_quota(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: Some(max_entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OverlayStore for MemoryOverlayStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SeatwatchError::cache("overlay store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SeatwatchError::cache("overlay store lock poisoned"))?;

        if let Some(max) = self.max_entries
            && !entries.contains_key(key)
            && entries.len() >= max
        {
            return Err(SeatwatchError::cache(format!(
                "overlay store quota exceeded ({max} entries)"
            )));
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed session store, so separate CLI runs share fetched overlays
pub struct SqliteOverlayStore {
    conn: Mutex<Connection>,
}

const OVERLAY_CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS overlay_cache (
    cache_key   TEXT PRIMARY KEY,
    value       TEXT NOT NULL
);
"#;

impl SqliteOverlayStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            SeatwatchError::cache_with_source(
                format!("failed to open overlay cache at {}", path.display()),
                e,
            )
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SeatwatchError::cache_with_source("failed to open overlay cache", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(OVERLAY_CACHE_SCHEMA)
            .map_err(|e| SeatwatchError::cache_with_source("failed to apply cache schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl OverlayStore for SqliteOverlayStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SeatwatchError::cache("overlay cache lock poisoned"))?;
        conn.query_row(
            "SELECT value FROM overlay_cache WHERE cache_key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| SeatwatchError::cache_with_source("failed to read overlay cache", e))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SeatwatchError::cache("overlay cache lock poisoned"))?;
        conn.execute(
            "INSERT OR REPLACE INTO overlay_cache (cache_key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| SeatwatchError::cache_with_source("failed to write overlay cache", e))?;
        Ok(())
    }
}

/// Stored value: fetch time in epoch milliseconds, the cycle year the
/// payload was fetched for, and the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEntry {
    pub ts: i64,
    pub year: i32,
    pub data: LivePayload,
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheRead {
    Hit(LivePayload),
    Miss,
    Expired { age_ms: i64 },
    /// Storage failed or held an unreadable value; treat as a miss
    Unavailable,
}

/// TTL-bounded overlay cache over an [`OverlayStore`]
#[derive(Clone)]
pub struct OverlayCache {
    store: Arc<dyn OverlayStore>,
    ttl: Duration,
}

impl OverlayCache {
    pub fn new(store: Arc<dyn OverlayStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// In-memory cache with the given TTL
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryOverlayStore::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn read(&self, seat_ids: &[SeatId], year: i32, now_ms: i64) -> CacheRead {
        let key = overlay_cache_key(seat_ids);

        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheRead::Miss,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Overlay cache read failed");
                return CacheRead::Unavailable;
            }
        };

        let entry: CachedEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Overlay cache entry unreadable");
                return CacheRead::Unavailable;
            }
        };

        if entry.year != year {
            tracing::debug!(
                key = %key,
                cached_year = entry.year,
                year,
                "Overlay cache entry belongs to another cycle"
            );
            return CacheRead::Miss;
        }

        let age_ms = now_ms.saturating_sub(entry.ts);
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if age_ms >= ttl_ms {
            tracing::debug!(key = %key, age_ms, "Overlay cache entry expired");
            return CacheRead::Expired { age_ms };
        }

        CacheRead::Hit(entry.data)
    }

    /// Store a freshly fetched payload. Failures are logged and reported as
    /// `false`.
    pub fn write(
        &self,
        seat_ids: &[SeatId],
        year: i32,
        payload: &LivePayload,
        now_ms: i64,
    ) -> bool {
        let key = overlay_cache_key(seat_ids);
        let entry = CachedEntry {
            ts: now_ms,
            year,
            data: payload.clone(),
        };

        let result = serde_json::to_string(&entry)
            .map_err(|e| SeatwatchError::cache_with_source("failed to encode overlay entry", e))
            .and_then(|raw| self.store.set(&key, &raw));

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Overlay cache write failed");
                false
            }
        }
    }
}
