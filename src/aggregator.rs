// src/aggregator.rs
//! Aggregation orchestrator: exclusive store + every adapter, concurrently,
//! merged into one feed.
//!
//! Group order is fixed by registration order of the adapters, followed by the
//! exclusive listings. Adapter failures never fail the aggregate; a failed
//! store read does.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};

use crate::ingest::browser::{HttpFetcher, PageFetcher, WebDriverFetcher};
use crate::ingest::cache::AdapterCache;
use crate::ingest::config::{AggregatorConfig, FetcherKind, SourceConfig};
use crate::ingest::providers::{
    internshala::InternshalaAdapter, linkedin::LinkedInAdapter, naukri::NaukriAdapter,
};
use crate::ingest::types::{
    AdapterError, AdapterOutcome, Listing, ListingSource, SourceAdapter,
};
use crate::ingest::{ensure_metrics_described, normalize};
use crate::store::{ExclusiveOrder, ExclusiveStore};

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("exclusive listings unavailable: {0:#}")]
    Store(#[source] anyhow::Error),
}

/// Freshness window and hard time limit for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterPolicy {
    pub ttl: Duration,
    pub timeout: Duration,
}

impl AdapterPolicy {
    pub fn from_config(cfg: &SourceConfig) -> Self {
        Self {
            ttl: cfg.cache_ttl(),
            timeout: cfg.timeout(),
        }
    }
}

struct AdapterSlot {
    adapter: Arc<dyn SourceAdapter>,
    policy: AdapterPolicy,
}

pub struct Aggregator {
    store: Arc<dyn ExclusiveStore>,
    cache: Arc<AdapterCache>,
    slots: Vec<AdapterSlot>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ExclusiveStore>, cache: Arc<AdapterCache>) -> Self {
        ensure_metrics_described();
        Self {
            store,
            cache,
            slots: Vec::new(),
        }
    }

    /// Register an adapter. Its listings appear after those of every adapter
    /// registered before it.
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>, policy: AdapterPolicy) -> Self {
        gauge!("adapter_cache_ttl_secs", "adapter" => adapter.key()).set(policy.ttl.as_secs_f64());
        self.slots.push(AdapterSlot { adapter, policy });
        self
    }

    /// Wire the enabled sources from config in feed order:
    /// LinkedIn, Internshala, Naukri.
    pub fn from_config(
        cfg: &AggregatorConfig,
        store: Arc<dyn ExclusiveStore>,
        cache: Arc<AdapterCache>,
    ) -> anyhow::Result<Self> {
        let webdriver: Arc<dyn PageFetcher> = Arc::new(WebDriverFetcher::new(
            cfg.webdriver.url.clone(),
            cfg.webdriver.headless,
            cfg.webdriver.block_assets,
        ));
        let http: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new()?);
        let pick = |kind: FetcherKind| match kind {
            FetcherKind::Webdriver => webdriver.clone(),
            FetcherKind::Http => http.clone(),
        };

        let s = &cfg.sources;
        let mut agg = Self::new(store, cache);
        if s.linkedin.enabled {
            let a = LinkedInAdapter::new(s.linkedin.clone(), pick(s.linkedin.fetcher));
            agg = agg.with_adapter(Arc::new(a), AdapterPolicy::from_config(&s.linkedin));
        }
        if s.internshala.enabled {
            let a = InternshalaAdapter::new(s.internshala.clone(), pick(s.internshala.fetcher));
            agg = agg.with_adapter(Arc::new(a), AdapterPolicy::from_config(&s.internshala));
        }
        if s.naukri.enabled {
            let a = NaukriAdapter::new(s.naukri.clone(), pick(s.naukri.fetcher));
            agg = agg.with_adapter(Arc::new(a), AdapterPolicy::from_config(&s.naukri));
        }
        tracing::info!(adapters = agg.slots.len(), "aggregator configured");
        Ok(agg)
    }

    /// Keys of the registered adapters, in feed order.
    pub fn adapter_keys(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.adapter.key()).collect()
    }

    /// Run one adapter through its cache under its timeout. Never fails.
    async fn run_adapter(&self, slot: &AdapterSlot) -> AdapterOutcome {
        let key = slot.adapter.key();
        let adapter = slot.adapter.clone();
        let timeout = slot.policy.timeout;

        let res = self
            .cache
            .get_or_fetch(key, slot.policy.ttl, || async move {
                match tokio::time::timeout(timeout, adapter.fetch_raw()).await {
                    Ok(r) => r,
                    Err(_) => Err(AdapterError::Timeout(timeout)),
                }
            })
            .await;

        match res {
            Ok(cached) => {
                counter!("adapter_cache_total", "adapter" => key, "status" => cached.status.as_str())
                    .increment(1);
                AdapterOutcome::Fetched {
                    records: cached.records,
                    cache: cached.status,
                }
            }
            Err(e) => {
                let kind = e.kind().as_str();
                tracing::warn!(adapter = key, kind, error = %e, "adapter failed; contributing no listings");
                counter!("adapter_failures_total", "adapter" => key, "kind" => kind).increment(1);
                AdapterOutcome::Failed(e)
            }
        }
    }

    /// Run every adapter concurrently and return outcomes in registration order.
    pub async fn collect_outcomes(&self) -> Vec<(&'static str, AdapterOutcome)> {
        let runs = self.slots.iter().map(|slot| async move {
            (slot.adapter.key(), self.run_adapter(slot).await)
        });
        futures::future::join_all(runs).await
    }

    /// The full feed: external groups in adapter order, then exclusive.
    pub async fn get_all_listings(&self) -> Result<Vec<Listing>, AggregateError> {
        counter!("aggregate_requests_total").increment(1);

        let (exclusive, outcomes) = tokio::join!(
            self.store.read_all(ExclusiveOrder::DeadlineAsc),
            self.collect_outcomes()
        );
        let exclusive = exclusive.map_err(|e| {
            tracing::error!(error = %format!("{e:#}"), "exclusive listings read failed");
            AggregateError::Store(e)
        })?;

        let mut all = Vec::new();
        for (slot, (key, outcome)) in self.slots.iter().zip(outcomes) {
            let (mut kept, rejected) = normalize(
                outcome.into_records(),
                ListingSource::External,
                slot.adapter.description_style(),
            );
            if rejected > 0 {
                counter!("normalize_rejected_total", "adapter" => key).increment(rejected as u64);
            }
            tracing::debug!(adapter = key, kept = kept.len(), rejected, "normalized");
            all.append(&mut kept);
        }
        all.extend(exclusive.into_iter().map(|row| row.into_listing()));

        ensure_unique_ids(&mut all);
        tracing::info!(total = all.len(), "listings aggregated");
        Ok(all)
    }

    /// First-party listings only; no scraping.
    pub async fn exclusive_listings(
        &self,
        order: ExclusiveOrder,
    ) -> Result<Vec<Listing>, AggregateError> {
        let rows = self.store.read_all(order).await.map_err(AggregateError::Store)?;
        Ok(rows.into_iter().map(|row| row.into_listing()).collect())
    }
}

/// Suffix repeated ids (`-2`, `-3`, ...) so ids are unique within one feed.
fn ensure_unique_ids(listings: &mut [Listing]) {
    let mut seen: HashSet<String> = HashSet::with_capacity(listings.len());
    for l in listings.iter_mut() {
        if seen.insert(l.id.clone()) {
            continue;
        }
        let mut n = 2usize;
        loop {
            let candidate = format!("{}-{n}", l.id);
            if seen.insert(candidate.clone()) {
                l.id = candidate;
                break;
            }
            n += 1;
        }
    }
}
