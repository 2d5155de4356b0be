// src/ingest/cache.rs
//! Per-adapter time-boxed memoization of raw records.
//!
//! - A fresh entry (younger than the TTL) is served without fetching.
//! - A successful fetch replaces the entry wholesale.
//! - A failed fetch keeps the previous entry and serves it as `Stale`.
//! - Refreshes for one key are serialized: concurrent callers wait on the
//!   key's slot and re-check freshness once they hold it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::ingest::types::{AdapterError, CacheStatus, RawRecord};

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<RawRecord>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

/// Records served by [`AdapterCache::get_or_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached {
    pub records: Vec<RawRecord>,
    pub status: CacheStatus,
}

#[derive(Debug, Default)]
pub struct AdapterCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().expect("cache slots mutex poisoned");
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    /// Return the cached records for `key` if fresh, otherwise run `fetch`.
    ///
    /// Errors only when the fetch fails and nothing was ever cached for `key`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Cached, AdapterError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RawRecord>, AdapterError>>,
    {
        let slot = self.slot(key);
        // Held across the fetch: this is what makes refreshes single-flight.
        let mut entry = slot.lock().await;

        if let Some(e) = entry.as_ref() {
            if e.is_fresh(ttl) {
                tracing::debug!(adapter = key, "serving cached records");
                return Ok(Cached {
                    records: e.records.clone(),
                    status: CacheStatus::Hit,
                });
            }
        }

        match fetch().await {
            Ok(records) => {
                *entry = Some(CacheEntry {
                    records: records.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(Cached {
                    records,
                    status: CacheStatus::Refreshed,
                })
            }
            Err(err) => match entry.as_ref() {
                Some(prev) => {
                    tracing::warn!(
                        adapter = key,
                        error = %err,
                        cached = prev.records.len(),
                        "refresh failed; serving previous records"
                    );
                    Ok(Cached {
                        records: prev.records.clone(),
                        status: CacheStatus::Stale,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Drop the entry for `key` so the next call fetches.
    #[cfg(test)]
    pub(crate) async fn invalidate(&self, key: &str) {
        let slot = self.slot(key);
        *slot.lock().await = None;
    }
}
