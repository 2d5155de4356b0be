// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod api;
pub mod ingest;
pub mod metrics;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{AdapterPolicy, AggregateError, Aggregator};
pub use crate::api::router;
pub use crate::ingest::cache::AdapterCache;
pub use crate::ingest::types::{
    AdapterError, AdapterOutcome, Listing, ListingSource, RawRecord, SourceAdapter,
};
pub use crate::store::{ExclusiveOrder, ExclusiveRow, ExclusiveStore};

use std::sync::Arc;

use tracing::info;

/// Build the aggregator from on-disk config and the environment.
///
/// Reads `config/aggregator.toml` (or `$AGGREGATOR_CONFIG_PATH`) and
/// `DATABASE_URL` / `DB_*`. The database pool connects lazily.
pub fn build_aggregator() -> anyhow::Result<Aggregator> {
    let cfg = ingest::config::load_config_default()?;
    let url = ingest::config::database_url_from_env()?;
    let store = store::PgExclusiveStore::connect_lazy(&url)?;
    let agg = Aggregator::from_config(&cfg, Arc::new(store), Arc::new(AdapterCache::new()))?;
    info!(adapters = ?agg.adapter_keys(), "aggregator ready");
    Ok(agg)
}
