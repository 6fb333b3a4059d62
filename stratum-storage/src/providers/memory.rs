//! In-memory cache tier.
//!
//! A process-wide, explicitly constructed store shared by every request.
//! Entries live in a [`DashMap`]; an insertion-ordered index drives capacity
//! eviction (oldest write evicted first). Expired entries are invisible to
//! readers and dropped lazily on access.
//!
//! # Thread Safety
//!
//! All methods take `&self`. Map shards and the order index are locked only
//! for the duration of a single synchronous step, never across an `.await`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use stratum_core::{CacheConfig, Record, RecordId, TierId};

use crate::provider::{ProviderResult, StorageProvider};

#[derive(Debug, Clone)]
struct CacheEntry {
    record: Record,
    inserted_at: Instant,
    seq: u64,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (expired entries included).
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries dropped because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Volatile cache tier backed by a concurrent map.
#[derive(Debug)]
pub struct MemoryCacheProvider {
    tier: TierId,
    entries: DashMap<RecordId, CacheEntry>,
    order: Mutex<BTreeMap<u64, RecordId>>,
    next_seq: AtomicU64,
    ttl: Option<Duration>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl MemoryCacheProvider {
    /// Create a cache tier named [`TierId::CACHE`].
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_tier(TierId::CACHE, config)
    }

    /// Create a cache tier reporting a custom tier identity.
    pub fn with_tier(tier: TierId, config: &CacheConfig) -> Self {
        Self {
            tier,
            entries: DashMap::new(),
            order: Mutex::new(BTreeMap::new()),
            next_seq: AtomicU64::new(0),
            ttl: config.ttl(),
            max_entries: config.max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// A cache with no TTL and no capacity bound.
    pub fn unbounded() -> Self {
        Self::new(&CacheConfig::default().with_ttl_secs(0).with_max_entries(0))
    }

    /// Drop every entry. Counters are kept.
    pub fn purge(&self) {
        self.entries.clear();
        self.order_index().clear();
    }

    /// Drop one entry, as an external eviction would.
    pub fn evict(&self, id: &RecordId) -> bool {
        match self.entries.remove(id) {
            Some((_, entry)) => {
                self.order_index().remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    /// Number of entries held, including ones whose TTL has elapsed but which
    /// have not been touched since.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn order_index(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, RecordId>> {
        // The index only mirrors the map; a panic mid-update leaves it usable.
        self.order.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .map(|ttl| entry.inserted_at.elapsed() >= ttl)
            .unwrap_or(false)
    }

    /// Remove `id` only if it still holds the entry written under `seq`.
    fn remove_exact(&self, id: &RecordId, seq: u64) -> bool {
        let removed = self.entries.remove_if(id, |_, entry| entry.seq == seq).is_some();
        if removed {
            self.order_index().remove(&seq);
        }
        removed
    }

    fn insert(&self, record: &Record) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry {
            record: record.clone(),
            inserted_at: Instant::now(),
            seq,
        };

        let previous = self.entries.insert(record.id.clone(), entry);
        {
            let mut order = self.order_index();
            if let Some(previous) = previous {
                order.remove(&previous.seq);
            }
            order.insert(seq, record.id.clone());
        }

        self.enforce_capacity();
    }

    fn enforce_capacity(&self) {
        if self.max_entries == 0 {
            return;
        }
        while self.entries.len() > self.max_entries {
            let oldest = self.order_index().pop_first();
            let Some((seq, id)) = oldest else {
                break;
            };
            if self
                .entries
                .remove_if(&id, |_, entry| entry.seq == seq)
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(tier = %self.tier, id = %id, "cache entry evicted");
            }
        }
    }
}

#[async_trait]
impl StorageProvider for MemoryCacheProvider {
    fn tier(&self) -> &TierId {
        &self.tier
    }

    async fn get(&self, id: &RecordId) -> ProviderResult<Option<Record>> {
        let found = self.entries.get(id).map(|entry| entry.value().clone());

        match found {
            Some(entry) if self.is_expired(&entry) => {
                self.remove_exact(id, entry.seq);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.record))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn save(&self, record: &Record) -> ProviderResult<()> {
        self.insert(record);
        Ok(())
    }

    async fn update(&self, record: &Record) -> ProviderResult<bool> {
        let current = self.entries.get(&record.id).map(|entry| entry.value().clone());
        match current {
            Some(entry) if !self.is_expired(&entry) => {
                self.insert(record);
                Ok(true)
            }
            Some(entry) => {
                self.remove_exact(&record.id, entry.seq);
                self.expirations.fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &RecordId) -> ProviderResult<()> {
        self.evict(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::ProviderError;

    #[tokio::test]
    async fn test_save_get_delete() -> Result<(), ProviderError> {
        let cache = MemoryCacheProvider::unbounded();
        let record = Record::new("hello");

        cache.save(&record).await?;
        assert_eq!(cache.get(&record.id).await?, Some(record.clone()));

        cache.delete(&record.id).await?;
        assert_eq!(cache.get(&record.id).await?, None);

        // Deleting again is a no-op.
        cache.delete(&record.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_requires_existing_entry() -> Result<(), ProviderError> {
        let cache = MemoryCacheProvider::unbounded();
        let mut record = Record::new("v1");

        assert!(!cache.update(&record).await?);
        assert!(cache.is_empty());

        cache.save(&record).await?;
        record.overwrite("v2");
        assert!(cache.update(&record).await?);
        assert_eq!(cache.get(&record.id).await?.map(|r| r.value), Some("v2".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() -> Result<(), ProviderError> {
        let cache = MemoryCacheProvider::new(&CacheConfig::default().with_max_entries(2));
        let first = Record::new("a");
        let second = Record::new("b");
        let third = Record::new("c");

        cache.save(&first).await?;
        cache.save(&second).await?;
        // Rewriting `first` makes `second` the oldest.
        cache.save(&first).await?;
        cache.save(&third).await?;

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&second.id).await?.is_none());
        assert!(cache.get(&first.id).await?.is_some());
        assert!(cache.get(&third.id).await?.is_some());
        assert_eq!(cache.stats().evictions, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() -> Result<(), ProviderError> {
        let cache = MemoryCacheProvider {
            ttl: Some(Duration::from_millis(10)),
            ..MemoryCacheProvider::unbounded()
        };
        let record = Record::new("short-lived");
        cache.save(&record).await?;

        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(cache.get(&record.id).await?.is_none());
        assert!(!cache.update(&record).await?);
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.entry_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_purge_and_stats() -> Result<(), ProviderError> {
        let cache = MemoryCacheProvider::unbounded();
        let record = Record::new("x");
        cache.save(&record).await?;

        cache.get(&record.id).await?;
        cache.purge();
        cache.get(&record.id).await?;

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }
}
