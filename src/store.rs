// src/store.rs
//! Read access to first-party ("exclusive") postings.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::ingest::derive_description;
use crate::ingest::types::{DescriptionStyle, Listing, ListingSource};

/// Column the store orders rows by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusiveOrder {
    /// Public feed: soonest deadline first.
    DeadlineAsc,
    /// Admin list: newest first.
    CreatedAtDesc,
}

/// One row of the `opportunities` table, as read by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct ExclusiveRow {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub link: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExclusiveRow {
    /// Stamp as exclusive regardless of any `source` column in the table.
    pub fn into_listing(self) -> Listing {
        let title = self.title.unwrap_or_default();
        let location = self.location.unwrap_or_default();
        let description = match self.description {
            Some(d) if !d.trim().is_empty() => d,
            _ => derive_description(DescriptionStyle::TitleAtCompany, &title, "", &location),
        };
        Listing {
            id: self.id,
            title,
            company: String::new(),
            location,
            link: self.link.unwrap_or_default(),
            description,
            source: ListingSource::Exclusive,
            deadline: self.deadline,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
pub trait ExclusiveStore: Send + Sync {
    async fn read_all(&self, order: ExclusiveOrder) -> anyhow::Result<Vec<ExclusiveRow>>;
}

pub struct PgExclusiveStore {
    pool: PgPool,
}

impl PgExclusiveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lazily connecting pool: startup never blocks on the database, and an
    /// unreachable database shows up as a failed read.
    pub fn connect_lazy(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;
        Ok(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str = "SELECT id::text AS id, title, description, location, \
     deadline::date AS deadline, link, created_at::timestamptz AS created_at \
     FROM opportunities";

fn query_for(order: ExclusiveOrder) -> String {
    let order_by = match order {
        ExclusiveOrder::DeadlineAsc => "ORDER BY deadline ASC",
        ExclusiveOrder::CreatedAtDesc => "ORDER BY created_at DESC",
    };
    format!("{SELECT_COLUMNS} {order_by}")
}

#[async_trait]
impl ExclusiveStore for PgExclusiveStore {
    async fn read_all(&self, order: ExclusiveOrder) -> anyhow::Result<Vec<ExclusiveRow>> {
        let sql = query_for(order);
        let rows = sqlx::query_as::<_, ExclusiveRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
