// src/ingest/types.rs
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where a listing came from. Scraped listings are always `External`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    Exclusive,
    External,
}

/// Canonical listing shape handed to API callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub location: String,
    pub link: String,
    pub description: String,
    pub source: ListingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Pre-normalization record as extracted from one result card.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
    pub description: Option<String>,
}

/// How a missing description is derived for an adapter's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionStyle {
    /// `"{title} at {company}"`
    TitleAtCompany,
    /// `"{title} at {company} ({location})"`
    TitleAtCompanyLocation,
}

/// Diagnostic class of an adapter failure. Both classes recover the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Structural,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::Structural => "structural",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("no element matched `{selector}`")]
    SelectorNotFound { selector: String },
    #[error("session state unusable: {0}")]
    Session(String),
    #[error("browser driver error: {0}")]
    Driver(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
}

impl AdapterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AdapterError::Navigation { .. } | AdapterError::Timeout(_) | AdapterError::Driver(_) => {
                FailureKind::Transient
            }
            AdapterError::SelectorNotFound { .. }
            | AdapterError::Session(_)
            | AdapterError::Extraction(_) => FailureKind::Structural,
        }
    }
}

/// How a successful adapter result was produced by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a fresh entry, no fetch.
    Hit,
    /// Fetched now and stored.
    Refreshed,
    /// Refresh failed; previous known-good entry served.
    Stale,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Refreshed => "refreshed",
            CacheStatus::Stale => "stale",
        }
    }
}

/// Outcome of one adapter invocation, kept explicit until the aggregation
/// boundary so "found nothing" and "errored" stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutcome {
    Fetched {
        records: Vec<RawRecord>,
        cache: CacheStatus,
    },
    Failed(AdapterError),
}

impl AdapterOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AdapterOutcome::Failed(_))
    }

    /// Collapse to the records this source contributes (empty on failure).
    pub fn into_records(self) -> Vec<RawRecord> {
        match self {
            AdapterOutcome::Fetched { records, .. } => records,
            AdapterOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// One external site. Implementations own their configuration and session
/// handling; errors are returned, the orchestrator decides what they mean.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable cache/metrics key, e.g. `"linkedin"`.
    fn key(&self) -> &'static str;
    fn description_style(&self) -> DescriptionStyle {
        DescriptionStyle::TitleAtCompany
    }
    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, AdapterError>;
}
