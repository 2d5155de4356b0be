// src/ingest/providers/internshala.rs
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use url::Url;

use crate::ingest::browser::{PageFetcher, PageLoad};
use crate::ingest::config::SourceConfig;
use crate::ingest::providers::{absolutize, href_of, load_one_page, load_session, selector, synth_id, text_of};
use crate::ingest::types::{AdapterError, DescriptionStyle, RawRecord, SourceAdapter};

const ORIGIN: &str = "https://internshala.com/";
const LISTING_URL: &str = "https://internshala.com/internships/";
pub const CARD_SELECTOR: &str = ".individual_internship";

pub struct InternshalaAdapter {
    cfg: SourceConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl InternshalaAdapter {
    pub fn new(cfg: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { cfg, fetcher }
    }

    /// `/internships/` or `/internships/{keyword}-internship/` when a keyword is set.
    pub fn listing_url(&self) -> String {
        let kw = self.cfg.keyword.trim();
        if kw.is_empty() {
            LISTING_URL.to_string()
        } else {
            let slug = kw.to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
            format!("{LISTING_URL}{slug}-internship/")
        }
    }
}

/// Extract up to `max` records. Internshala emits site-relative detail links.
pub fn parse_cards(html: &str, max: usize) -> Result<Vec<RawRecord>, AdapterError> {
    let card = selector(CARD_SELECTOR)?;
    let title = selector("a.job_title_href")?;
    let company = selector(".company")?;
    let location = selector(".location_link")?;
    let base = Url::parse(ORIGIN).map_err(|e| AdapterError::Extraction(e.to_string()))?;

    let doc = scraper::Html::parse_document(html);
    let out = doc
        .select(&card)
        .take(max)
        .map(|el| RawRecord {
            id: synth_id("is"),
            title: text_of(&el, &title),
            company: text_of(&el, &company),
            location: text_of(&el, &location),
            link: absolutize(&base, &href_of(&el, &title)),
            description: None,
        })
        .collect();
    Ok(out)
}

#[async_trait]
impl SourceAdapter for InternshalaAdapter {
    fn key(&self) -> &'static str {
        "internshala"
    }

    fn description_style(&self) -> DescriptionStyle {
        DescriptionStyle::TitleAtCompanyLocation
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, AdapterError> {
        let cookies = load_session(&self.cfg)?;
        let url = self.listing_url();

        let html = load_one_page(
            self.fetcher.as_ref(),
            ORIGIN,
            &cookies,
            PageLoad {
                url: &url,
                wait_for: CARD_SELECTOR,
                nav_timeout: self.cfg.nav_timeout(),
                wait_timeout: self.cfg.wait_timeout(),
            },
        )
        .await?;

        let records = parse_cards(&html, self.cfg.max_per_page)?;
        counter!("adapter_records_total", "adapter" => "internshala")
            .increment(records.len() as u64);
        tracing::info!(target: "ingest", adapter = "internshala", count = records.len(), "scraped");
        Ok(records)
    }
}
