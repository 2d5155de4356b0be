// tests/aggregate_e2e.rs
//
// Full aggregation with stub adapters and an in-memory exclusive store.
// Paused time lets the slow adapter run into its timeout instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use opportunity_aggregator::ingest::types::{CacheStatus, DescriptionStyle};
use opportunity_aggregator::{
    AdapterCache, AdapterError, AdapterOutcome, AdapterPolicy, AggregateError, Aggregator,
    ExclusiveOrder, ExclusiveRow, ExclusiveStore, ListingSource, RawRecord, SourceAdapter,
};

enum Behaviour {
    Records(Vec<RawRecord>),
    Fail(AdapterError),
    Sleep(Duration),
}

struct StubAdapter {
    key: &'static str,
    style: DescriptionStyle,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl StubAdapter {
    fn new(key: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            key,
            style: DescriptionStyle::TitleAtCompany,
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn key(&self) -> &'static str {
        self.key
    }

    fn description_style(&self) -> DescriptionStyle {
        self.style
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Records(r) => Ok(r.clone()),
            Behaviour::Fail(e) => Err(e.clone()),
            Behaviour::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok(vec![record(self.key, 0, true)])
            }
        }
    }
}

#[derive(Default)]
struct MemStore {
    rows: Vec<ExclusiveRow>,
    fail: bool,
    orders: Mutex<Vec<ExclusiveOrder>>,
}

#[async_trait]
impl ExclusiveStore for MemStore {
    async fn read_all(&self, order: ExclusiveOrder) -> anyhow::Result<Vec<ExclusiveRow>> {
        self.orders.lock().push(order);
        if self.fail {
            anyhow::bail!("connection refused");
        }
        Ok(self.rows.clone())
    }
}

fn record(prefix: &str, i: usize, complete: bool) -> RawRecord {
    RawRecord {
        id: format!("{prefix}-{i}"),
        title: format!("Role {i}"),
        company: "Acme".into(),
        location: if complete { "Remote".into() } else { String::new() },
        link: format!("https://jobs.example/{prefix}/{i}"),
        description: None,
    }
}

/// Five valid records followed by three without a location.
fn batch(prefix: &str) -> Vec<RawRecord> {
    (0..8).map(|i| record(prefix, i, i < 5)).collect()
}

fn exclusive_rows() -> Vec<ExclusiveRow> {
    vec![
        ExclusiveRow {
            id: "101".into(),
            title: Some("Campus Ambassador".into()),
            description: Some("Represent us on campus".into()),
            location: Some("Pune".into()),
            deadline: NaiveDate::from_ymd_opt(2026, 11, 1),
            link: Some("https://example.org/apply/101".into()),
            created_at: None,
        },
        ExclusiveRow {
            id: "102".into(),
            title: Some("Research Fellow".into()),
            location: Some("Delhi".into()),
            deadline: NaiveDate::from_ymd_opt(2026, 12, 15),
            link: Some("https://example.org/apply/102".into()),
            ..Default::default()
        },
    ]
}

fn policy(timeout_secs: u64) -> AdapterPolicy {
    AdapterPolicy {
        ttl: Duration::from_secs(600),
        timeout: Duration::from_secs(timeout_secs),
    }
}

fn three_adapter_aggregator(store: MemStore) -> Aggregator {
    Aggregator::new(Arc::new(store), Arc::new(AdapterCache::new()))
        .with_adapter(StubAdapter::new("li", Behaviour::Records(batch("li"))), policy(60))
        .with_adapter(StubAdapter::new("is", Behaviour::Records(batch("is"))), policy(60))
        .with_adapter(
            StubAdapter::new("nk", Behaviour::Sleep(Duration::from_secs(300))),
            policy(5),
        )
}

#[tokio::test(start_paused = true)]
async fn merges_valid_external_groups_then_exclusive() {
    let agg = three_adapter_aggregator(MemStore {
        rows: exclusive_rows(),
        ..Default::default()
    });

    let all = agg.get_all_listings().await.expect("store is healthy");
    assert_eq!(all.len(), 12, "5 + 5 + 0 + 2");

    let ids: Vec<_> = all.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "li-0", "li-1", "li-2", "li-3", "li-4", "is-0", "is-1", "is-2", "is-3", "is-4", "101",
            "102"
        ]
    );

    assert!(all[..10].iter().all(|l| l.source == ListingSource::External));
    assert!(all[10..].iter().all(|l| l.source == ListingSource::Exclusive));
    assert_eq!(all[0].description, "Role 0 at Acme");
    assert_eq!(all[10].description, "Represent us on campus");
    assert_eq!(all[11].description, "Research Fellow");
    assert_eq!(all[10].deadline, NaiveDate::from_ymd_opt(2026, 11, 1));
}

#[tokio::test(start_paused = true)]
async fn public_feed_reads_exclusive_by_deadline() {
    let store = Arc::new(MemStore::default());
    let agg = Aggregator::new(store.clone(), Arc::new(AdapterCache::new()));

    agg.get_all_listings().await.unwrap();
    agg.exclusive_listings(ExclusiveOrder::CreatedAtDesc)
        .await
        .unwrap();

    assert_eq!(
        *store.orders.lock(),
        vec![ExclusiveOrder::DeadlineAsc, ExclusiveOrder::CreatedAtDesc]
    );
}

#[tokio::test(start_paused = true)]
async fn store_failure_fails_the_whole_call() {
    let agg = three_adapter_aggregator(MemStore {
        fail: true,
        ..Default::default()
    });

    let err = agg.get_all_listings().await.unwrap_err();
    assert!(matches!(err, AggregateError::Store(_)));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn timed_out_adapter_is_reported_as_failed() {
    let agg = three_adapter_aggregator(MemStore::default());

    let outcomes = agg.collect_outcomes().await;
    let keys: Vec<_> = outcomes.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["li", "is", "nk"]);

    assert!(!outcomes[0].1.is_failed());
    assert!(!outcomes[1].1.is_failed());
    match &outcomes[2].1 {
        AdapterOutcome::Failed(AdapterError::Timeout(d)) => assert_eq!(*d, Duration::from_secs(5)),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn failing_adapter_does_not_block_the_others() {
    let broken = StubAdapter::new(
        "li",
        Behaviour::Fail(AdapterError::SelectorNotFound {
            selector: ".base-search-card".into(),
        }),
    );
    let healthy = StubAdapter::new("is", Behaviour::Records(batch("is")));
    let agg = Aggregator::new(Arc::new(MemStore::default()), Arc::new(AdapterCache::new()))
        .with_adapter(broken, policy(60))
        .with_adapter(healthy, policy(60));

    let all = agg.get_all_listings().await.unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|l| l.id.starts_with("is-")));
}

#[tokio::test(start_paused = true)]
async fn repeated_calls_keep_group_order_and_hit_the_cache() {
    let li = StubAdapter::new("li", Behaviour::Records(batch("li")));
    let is = StubAdapter::new("is", Behaviour::Records(batch("is")));
    let agg = Aggregator::new(
        Arc::new(MemStore {
            rows: exclusive_rows(),
            ..Default::default()
        }),
        Arc::new(AdapterCache::new()),
    )
    .with_adapter(li.clone(), policy(60))
    .with_adapter(is.clone(), policy(60));

    let first = agg.get_all_listings().await.unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    let second = agg.get_all_listings().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(li.calls.load(Ordering::SeqCst), 1);
    assert_eq!(is.calls.load(Ordering::SeqCst), 1);
    assert_eq!(agg.adapter_keys(), vec!["li", "is"]);
}

#[tokio::test(start_paused = true)]
async fn stale_records_are_served_when_a_refresh_fails() {
    let cache = Arc::new(AdapterCache::new());
    cache
        .get_or_fetch("li", Duration::from_secs(60), || async { Ok(batch("li")) })
        .await
        .unwrap();
    tokio::time::advance(Duration::from_secs(120)).await;

    let agg = Aggregator::new(Arc::new(MemStore::default()), cache).with_adapter(
        StubAdapter::new("li", Behaviour::Fail(AdapterError::Driver("session deleted".into()))),
        AdapterPolicy {
            ttl: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
        },
    );

    let outcomes = agg.collect_outcomes().await;
    match &outcomes[0].1 {
        AdapterOutcome::Fetched { records, cache } => {
            assert_eq!(records.len(), 8);
            assert_eq!(cache.as_str(), "stale");
        }
        other => panic!("expected stale records, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn timed_out_refresh_serves_previous_records() {
    let cache = Arc::new(AdapterCache::new());
    let ttl = Duration::from_secs(600);
    cache
        .get_or_fetch("nk", ttl, || async { Ok(batch("nk")) })
        .await
        .unwrap();
    tokio::time::advance(ttl + Duration::from_secs(1)).await;

    let slow = StubAdapter::new("nk", Behaviour::Sleep(Duration::from_secs(300)));
    let agg = Aggregator::new(Arc::new(MemStore::default()), cache)
        .with_adapter(slow.clone(), policy(5));

    let outcomes = agg.collect_outcomes().await;
    match &outcomes[0].1 {
        AdapterOutcome::Fetched { records, cache } => {
            assert_eq!(records, &batch("nk"));
            assert_eq!(*cache, CacheStatus::Stale);
        }
        other => panic!("expected stale records after the timeout, got {other:?}"),
    }
    assert_eq!(slow.calls.load(Ordering::SeqCst), 1, "refresh was attempted");

    let all = agg.get_all_listings().await.unwrap();
    assert_eq!(all.len(), 5, "stale batch still contributes its valid records");
}
