//! Process-local, cost-bounded, TTL-based read cache.
//!
//! [`ReadCache`] sits in front of transactional reads. Residency is bounded
//! by a total cost ceiling and enforced by `moka`'s TinyLFU admission and
//! eviction, so entries can be declined or evicted before their TTL runs
//! out. Every entry also records its expiry instant against an injected
//! [`Clock`]; a `get` at or past that instant is a miss and drops the
//! entry, regardless of whether `moka` has reaped it yet.
//!
//! Cache operations never fail: a declined `put` just means the next read
//! goes to the store again.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use crate::clock::{Clock, SystemClock};

/// One resident value with its admission cost and expiry.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    cost: u32,
    ttl: Duration,
    expires_at: Instant,
}

/// Per-entry TTL policy: each entry lives for the TTL it was put with.
struct EntryTtl;

impl<K, V> Expiry<K, CacheEntry<V>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &K,
        entry: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &K,
        entry: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Cost- and TTL-bounded cache keyed by entity id.
#[derive(Clone)]
pub struct ReadCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    name: &'static str,
    max_cost: u64,
    inner: Cache<K, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> ReadCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose resident cost never exceeds `max_cost`.
    pub fn new(name: &'static str, max_cost: u64) -> Self {
        Self::with_clock(name, max_cost, Arc::new(SystemClock))
    }

    /// Create a cache that judges expiry against `clock`.
    pub fn with_clock(name: &'static str, max_cost: u64, clock: Arc<dyn Clock>) -> Self {
        let inner = Cache::builder()
            .name(name)
            .max_capacity(max_cost)
            .weigher(|_key: &K, entry: &CacheEntry<V>| entry.cost)
            .expire_after(EntryTtl)
            .build();

        Self {
            name,
            max_cost,
            inner,
            clock,
        }
    }

    /// Look up `key`. Entries at or past their expiry are misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.inner.get(key)?;
        if self.clock.now() >= entry.expires_at {
            self.inner.invalidate(key);
            return None;
        }
        Some(entry.value)
    }

    /// Offer `value` for `ttl` at admission cost `cost`.
    ///
    /// Returns `false` when the entry is declined outright because it could
    /// never fit. An accepted offer may still be evicted under cost pressure.
    pub fn put(&self, key: K, value: V, cost: u32, ttl: Duration) -> bool {
        if ttl.is_zero() || u64::from(cost) > self.max_cost {
            tracing::debug!(cache = self.name, cost, "cache admission declined");
            return false;
        }
        let Some(expires_at) = self.clock.now().checked_add(ttl) else {
            return false;
        };
        self.inner.insert(
            key,
            CacheEntry {
                value,
                cost,
                ttl,
                expires_at,
            },
        );
        true
    }

    /// Drop `key` after a write so the next read goes to the store.
    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
        tracing::debug!(cache = self.name, "cache cleared");
    }

    /// Total cost currently resident, after applying pending evictions.
    pub fn resident_cost(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.weighted_size()
    }

    /// The configured cost ceiling.
    pub const fn max_cost(&self) -> u64 {
        self.max_cost
    }
}
