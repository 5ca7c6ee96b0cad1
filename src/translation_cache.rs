//! Translation cache.
//!
//! An LRU cache of unbound translations so the same statement is walked only
//! once per platform and filter state. Parameters are not part of the key:
//! a cached [`Translation`] still carries its parameter references and is
//! bound per execution.
//!
//! Cache key: SHA-256 over the JSON form of the statement and hints, the
//! platform name and the enabled filter names.
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::query::{QueryHints, Statement};
use crate::sql_walker::Translation;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationCacheKey {
    fingerprint: String,
}

#[derive(Serialize)]
struct KeyMaterial<'a> {
    statement: &'a Statement,
    hints: &'a QueryHints,
    platform: &'a str,
    filters: &'a [&'a str],
}

impl TranslationCacheKey {
    pub fn new(
        statement: &Statement,
        hints: &QueryHints,
        platform: &str,
        enabled_filters: &[&str],
    ) -> Result<Self, serde_json::Error> {
        let mut filters = enabled_filters.to_vec();
        filters.sort_unstable();
        let material = serde_json::to_vec(&KeyMaterial {
            statement,
            hints,
            platform,
            filters: &filters,
        })?;
        let digest = Sha256::digest(&material);
        Ok(TranslationCacheKey {
            fingerprint: hex::encode(digest),
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    translation: Translation,
    /// Logical clock of the last access (for LRU)
    last_accessed: u64,
}

/// Translation cache with LRU eviction
#[derive(Debug)]
pub struct TranslationCache {
    entries: Mutex<HashMap<TranslationCacheKey, CacheEntry>>,
    enabled: bool,
    max_entries: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TranslationCache {
    pub fn new(enabled: bool, max_entries: usize) -> Self {
        TranslationCache {
            entries: Mutex::new(HashMap::new()),
            enabled,
            max_entries: max_entries.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, 1)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TranslationCacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, key: &TranslationCacheKey) -> Option<Translation> {
        if !self.enabled {
            return None;
        }

        let now = self.tick();
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.last_accessed = now;
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Translation cache hit {}", key.fingerprint);
            Some(entry.translation.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// May evict the least recently used entry when full
    pub fn insert(&self, key: TranslationCacheKey, translation: Translation) {
        if !self.enabled {
            return;
        }

        let now = self.tick();
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            self.evict_lru(&mut entries);
        }
        entries.insert(
            key,
            CacheEntry {
                translation,
                last_accessed: now,
            },
        );
    }

    fn evict_lru(&self, entries: &mut HashMap<TranslationCacheKey, CacheEntry>) {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| key.clone())
        {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::debug!("Translation cache evicted {}", key.fingerprint);
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let entries = self.lock();
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: entries.len(),
            max_entries: self.max_entries,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
