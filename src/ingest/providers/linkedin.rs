// src/ingest/providers/linkedin.rs
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use url::Url;

use crate::ingest::browser::{PageFetcher, PageLoad};
use crate::ingest::config::SourceConfig;
use crate::ingest::providers::{absolutize, href_of, load_one_page, load_session, selector, synth_id, text_of};
use crate::ingest::types::{AdapterError, DescriptionStyle, RawRecord, SourceAdapter};

const ORIGIN: &str = "https://www.linkedin.com/";
const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";
pub const CARD_SELECTOR: &str = ".base-search-card";

/// Guest job search on LinkedIn. Results need a logged-in session to be
/// complete, so cookies are installed before the search page loads.
pub struct LinkedInAdapter {
    cfg: SourceConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl LinkedInAdapter {
    pub fn new(cfg: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { cfg, fetcher }
    }

    pub fn search_url(&self) -> Result<Url, AdapterError> {
        Url::parse_with_params(
            SEARCH_URL,
            &[
                ("keywords", self.cfg.keyword.as_str()),
                ("location", self.cfg.location.as_str()),
            ],
        )
        .map_err(|e| AdapterError::Extraction(format!("linkedin search url: {e}")))
    }
}

/// Extract up to `max` records from a LinkedIn search result page.
pub fn parse_cards(html: &str, max: usize) -> Result<Vec<RawRecord>, AdapterError> {
    let card = selector(CARD_SELECTOR)?;
    let title = selector(".base-search-card__title")?;
    let company = selector(".base-search-card__subtitle")?;
    let location = selector(".job-search-card__location")?;
    let link = selector("a.base-card__full-link")?;
    let base = Url::parse(ORIGIN).map_err(|e| AdapterError::Extraction(e.to_string()))?;

    let doc = scraper::Html::parse_document(html);
    let out = doc
        .select(&card)
        .take(max)
        .map(|el| RawRecord {
            id: synth_id("li"),
            title: text_of(&el, &title),
            company: text_of(&el, &company),
            location: text_of(&el, &location),
            link: absolutize(&base, &href_of(&el, &link)),
            description: None,
        })
        .collect();
    Ok(out)
}

#[async_trait]
impl SourceAdapter for LinkedInAdapter {
    fn key(&self) -> &'static str {
        "linkedin"
    }

    fn description_style(&self) -> DescriptionStyle {
        DescriptionStyle::TitleAtCompany
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, AdapterError> {
        let cookies = load_session(&self.cfg)?;
        let url = self.search_url()?;

        let html = load_one_page(
            self.fetcher.as_ref(),
            ORIGIN,
            &cookies,
            PageLoad {
                url: url.as_str(),
                wait_for: CARD_SELECTOR,
                nav_timeout: self.cfg.nav_timeout(),
                wait_timeout: self.cfg.wait_timeout(),
            },
        )
        .await?;

        let records = parse_cards(&html, self.cfg.max_per_page)?;
        counter!("adapter_records_total", "adapter" => "linkedin").increment(records.len() as u64);
        tracing::info!(target: "ingest", adapter = "linkedin", count = records.len(), "scraped");
        Ok(records)
    }
}
