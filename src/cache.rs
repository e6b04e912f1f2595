//! # Snapshot Cache
//! Per-source TTL memoization of fetch results.
//!
//! - Absolute TTL per entry, no sliding refresh.
//! - Expired entries are evicted on the access that finds them; there is no
//!   background sweeper.
//! - Failures are never stored. A failed fetch leaves whatever entry exists
//!   untouched.
//!
//! The table sits behind a mutex so concurrent render passes are safe; the
//! lock is never held across a fetch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::error::FetchError;
use crate::snapshot::{MarketSnapshot, Provenance};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub snapshot: MarketSnapshot,
    pub stored_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    /// Valid iff `now - stored_at < ttl`. A clock that went backwards counts
    /// as age zero.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let age = (now - self.stored_at).to_std().unwrap_or_default();
        age < self.ttl
    }
}

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Serve a fresh entry as `Cached`, otherwise run `fetch_fn`, store the
    /// result and return it as `Live`. Errors pass through uncached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        source_id: &str,
        ttl: Duration,
        fetch_fn: F,
    ) -> Result<MarketSnapshot, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MarketSnapshot, FetchError>>,
    {
        if let Some(hit) = self.lookup_at(source_id, Utc::now()) {
            counter!("snapshot_cache_hits_total", "source" => source_id.to_string()).increment(1);
            tracing::debug!(target: "cache", source = source_id, "cache hit");
            return Ok(hit);
        }
        counter!("snapshot_cache_misses_total", "source" => source_id.to_string()).increment(1);
        tracing::debug!(target: "cache", source = source_id, "cache miss");

        self.fetch_and_store(source_id, ttl, fetch_fn).await
    }

    /// Always fetch. On success the entry is replaced; on failure any
    /// existing entry, fresh or not, stays exactly as it was.
    pub async fn refresh<F, Fut>(
        &self,
        source_id: &str,
        ttl: Duration,
        fetch_fn: F,
    ) -> Result<MarketSnapshot, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MarketSnapshot, FetchError>>,
    {
        self.fetch_and_store(source_id, ttl, fetch_fn).await
    }

    async fn fetch_and_store<F, Fut>(
        &self,
        source_id: &str,
        ttl: Duration,
        fetch_fn: F,
    ) -> Result<MarketSnapshot, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MarketSnapshot, FetchError>>,
    {
        let fresh = fetch_fn().await?.with_provenance(Provenance::Live);
        self.store_at(source_id, fresh.clone(), ttl, Utc::now());
        Ok(fresh)
    }

    /// Fresh entry for `source_id` as of `now`, tagged `Cached`. An expired
    /// entry is evicted and `None` returned.
    pub fn lookup_at(&self, source_id: &str, now: DateTime<Utc>) -> Option<MarketSnapshot> {
        let mut table = self.table();
        match table.get(source_id) {
            Some(entry) if entry.is_valid_at(now) => {
                Some(entry.snapshot.clone().with_provenance(Provenance::Cached))
            }
            Some(_) => {
                table.remove(source_id);
                tracing::debug!(target: "cache", source = source_id, "evicted expired entry");
                None
            }
            None => None,
        }
    }

    pub fn store_at(
        &self,
        source_id: &str,
        snapshot: MarketSnapshot,
        ttl: Duration,
        stored_at: DateTime<Utc>,
    ) {
        self.table().insert(
            source_id.to_string(),
            CacheEntry {
                snapshot,
                stored_at,
                ttl,
            },
        );
    }

    /// Raw entry without validity checks or eviction (diagnostics/tests).
    pub fn peek(&self, source_id: &str) -> Option<CacheEntry> {
        self.table().get(source_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
