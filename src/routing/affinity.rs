//! Query-affinity cache.
//!
//! # Responsibilities
//! - Remember which backend owns a query id
//! - Expire entries after a fixed idle time (sliding, reset on every hit)
//! - Bound memory with least-recently-used eviction
//!
//! # Design Decisions
//! - Expiry is checked lazily on access; `purge_expired` sweeps the rest
//! - Lock is never held across an await point

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::observability::metrics;

#[derive(Debug)]
struct Entry {
    address: String,
    last_access: Instant,
}

/// Bounded `query_id → backend address` cache with sliding expiry.
#[derive(Debug)]
pub struct AffinityCache {
    entries: Mutex<LruCache<String, Entry>>,
    idle_ttl: Duration,
}

impl AffinityCache {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            idle_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up `query_id`, refreshing its idle clock on a hit.
    pub fn get(&self, query_id: &str) -> Option<String> {
        self.get_at(query_id, Instant::now())
    }

    pub(crate) fn get_at(&self, query_id: &str, now: Instant) -> Option<String> {
        let mut entries = self.lock();
        let expired = match entries.get_mut(query_id) {
            Some(entry) if now.saturating_duration_since(entry.last_access) < self.idle_ttl => {
                entry.last_access = now;
                metrics::record_affinity_lookup(true);
                return Some(entry.address.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(query_id);
            tracing::debug!(query_id = %query_id, "Affinity entry expired");
        }
        metrics::record_affinity_lookup(false);
        None
    }

    /// Remember that `query_id` runs on `address`.
    pub fn insert(&self, query_id: &str, address: &str) {
        self.insert_at(query_id, address, Instant::now());
    }

    pub(crate) fn insert_at(&self, query_id: &str, address: &str, now: Instant) {
        let mut entries = self.lock();
        entries.put(
            query_id.to_string(),
            Entry {
                address: address.to_string(),
                last_access: now,
            },
        );
        metrics::record_affinity_size(entries.len());
    }

    /// Drop every entry idle for longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.last_access) >= self.idle_ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        metrics::record_affinity_size(entries.len());
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
