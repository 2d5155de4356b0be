// src/ingest/mod.rs
pub mod browser;
pub mod cache;
pub mod config;
pub mod providers;
pub mod session;
pub mod types;

use crate::ingest::types::{DescriptionStyle, Listing, ListingSource, RawRecord};
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_requests_total",
            "Aggregation runs started (all sources)."
        );
        describe_counter!(
            "adapter_records_total",
            "Raw records returned by adapters, per adapter."
        );
        describe_counter!(
            "adapter_failures_total",
            "Adapter runs that contributed nothing because of an error."
        );
        describe_counter!(
            "adapter_cache_total",
            "Adapter cache lookups by status (hit/refreshed/stale)."
        );
        describe_counter!(
            "normalize_rejected_total",
            "Raw records dropped for missing title/location/link."
        );
        describe_gauge!(
            "adapter_cache_ttl_secs",
            "Configured cache freshness window per adapter."
        );
    });
}

/// Clean text pulled out of markup: decode entities, collapse whitespace, trim.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    let mut out = re_ws.replace_all(&decoded, " ").trim().to_string();

    // Length cap: 500 chars
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }
    out
}

/// Build the description used when a record carries none.
pub fn derive_description(style: DescriptionStyle, title: &str, company: &str, location: &str) -> String {
    let head = if company.is_empty() {
        title.to_string()
    } else {
        format!("{title} at {company}")
    };
    match style {
        DescriptionStyle::TitleAtCompany => head,
        DescriptionStyle::TitleAtCompanyLocation => format!("{head} ({location})"),
    }
}

/// Validate and canonicalize one source's raw records.
/// Returns (kept, rejected_count). Order is preserved.
pub fn normalize(
    raw: Vec<RawRecord>,
    source: ListingSource,
    style: DescriptionStyle,
) -> (Vec<Listing>, usize) {
    let mut rejected = 0usize;
    let mut out = Vec::with_capacity(raw.len());

    for rec in raw {
        let complete = !rec.title.trim().is_empty()
            && !rec.location.trim().is_empty()
            && !rec.link.trim().is_empty();
        if !complete {
            rejected += 1;
            continue;
        }

        let description = match rec.description {
            Some(d) if !d.trim().is_empty() => d,
            _ => derive_description(style, &rec.title, &rec.company, &rec.location),
        };

        out.push(Listing {
            id: rec.id,
            title: rec.title,
            company: rec.company,
            location: rec.location,
            link: rec.link,
            description,
            source,
            deadline: None,
            created_at: None,
        });
    }

    (out, rejected)
}
