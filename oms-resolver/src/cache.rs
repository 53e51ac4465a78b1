//! TTL cache for single-record lookups.
//!
//! Entries are immutable once written. A racing pair of misses on the same key
//! may both write; the later write replaces the earlier one with an equivalent
//! record, so readers never see a partial value.

use oms_types::{FilterValue, Record, RowFilter};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

/// Every this many inserts, expired entries are swept from the store.
const PURGE_INTERVAL: usize = 256;

/// `type:id:properties|row-filter`. The property list is sorted so the same
/// projection requested in a different order shares an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    object_type: String,
    key: String,
}

impl CacheKey {
    pub fn new(
        object_type: &str,
        id: &FilterValue,
        properties: &[String],
        row_filter: &RowFilter,
    ) -> Self {
        let mut props: Vec<&str> = properties.iter().map(String::as_str).collect();
        props.sort_unstable();
        props.dedup();
        Self {
            object_type: object_type.to_string(),
            key: format!(
                "{object_type}:{id}:{}|{}",
                props.join(","),
                row_filter.signature()
            ),
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Record,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < self.ttl
    }
}

#[derive(Debug)]
pub struct CacheStore {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    inserts: AtomicUsize,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<Record> {
        self.get_at(key, Instant::now())
    }

    /// Looks up `key` as of `now`. An expired entry is dropped and reported
    /// as a miss.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Record> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.is_live(now) {
            return Some(entry.value.clone());
        }
        entries.remove(key);
        None
    }

    pub fn insert(&self, key: CacheKey, value: Record) {
        self.insert_at(key, value, Instant::now());
    }

    /// Stores `value` as of `now`. Every [`PURGE_INTERVAL`]th insert first
    /// sweeps out expired entries, including ones never read again.
    pub fn insert_at(&self, key: CacheKey, value: Record, now: Instant) {
        let entry = CacheEntry {
            value,
            inserted_at: now,
            ttl: self.ttl,
        };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            let before = entries.len();
            entries.retain(|_, e| e.is_live(now));
            trace!(purged = before - entries.len(), "cache sweep");
        }
        entries.insert(key, entry);
    }

    /// Removes one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Removes every entry of one object type. Returns how many were removed.
    pub fn invalidate_type(&self, object_type: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|k, _| k.object_type != object_type);
        before - entries.len()
    }

    /// Drops expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
