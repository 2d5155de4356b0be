// src/ingest/providers/naukri.rs
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use url::Url;

use crate::ingest::browser::{PageFetcher, PageLoad};
use crate::ingest::config::SourceConfig;
use crate::ingest::providers::{absolutize, href_of, load_session, selector, synth_id, text_of};
use crate::ingest::types::{AdapterError, DescriptionStyle, RawRecord, SourceAdapter};

const ORIGIN: &str = "https://www.naukri.com/";
pub const CARD_SELECTOR: &str = ".cust-job-tuple.layout-wrapper";

/// Multi-page adapter: walks `pages` result pages in one browser session.
///
/// A page without results ends the walk early and keeps what earlier pages
/// produced. On page 1 there is nothing to keep, so it is a failure.
pub struct NaukriAdapter {
    cfg: SourceConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl NaukriAdapter {
    pub fn new(cfg: SourceConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { cfg, fetcher }
    }

    /// `https://www.naukri.com/{keyword}-jobs-{page}`
    pub fn page_url(&self, page: u32) -> String {
        let kw = self.cfg.keyword.trim().to_ascii_lowercase();
        let slug = if kw.is_empty() {
            "remote".to_string()
        } else {
            kw.split_whitespace().collect::<Vec<_>>().join("-")
        };
        format!("{ORIGIN}{slug}-jobs-{page}")
    }
}

/// Extract up to `max` records from one Naukri result page.
pub fn parse_cards(html: &str, max: usize) -> Result<Vec<RawRecord>, AdapterError> {
    let card = selector(CARD_SELECTOR)?;
    let title = selector("a.title")?;
    let company = selector(".comp-name span")?;
    let location = selector(".locWdth")?;
    let base = Url::parse(ORIGIN).map_err(|e| AdapterError::Extraction(e.to_string()))?;

    let doc = scraper::Html::parse_document(html);
    let out = doc
        .select(&card)
        .take(max)
        .map(|el| RawRecord {
            id: synth_id("nk"),
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
impl SourceAdapter for NaukriAdapter {
    fn key(&self) -> &'static str {
        "naukri"
    }

    fn description_style(&self) -> DescriptionStyle {
        DescriptionStyle::TitleAtCompany
    }

    async fn fetch_raw(&self) -> Result<Vec<RawRecord>, AdapterError> {
        let cookies = load_session(&self.cfg)?;
        let mut session = self
            .fetcher
            .open(ORIGIN, &cookies, self.cfg.nav_timeout())
            .await?;

        let mut records = Vec::new();
        let mut failure = None;
        for page in 1..=self.cfg.pages.max(1) {
            let url = self.page_url(page);
            tracing::debug!(target: "ingest", adapter = "naukri", %url, "loading page");

            let loaded = session
                .load(&PageLoad {
                    url: &url,
                    wait_for: CARD_SELECTOR,
                    nav_timeout: self.cfg.nav_timeout(),
                    wait_timeout: self.cfg.wait_timeout(),
                })
                .await;

            let html = match loaded {
                Ok(html) => html,
                Err(AdapterError::SelectorNotFound { .. }) if page > 1 => {
                    tracing::warn!(target: "ingest", adapter = "naukri", page, "no jobs found on page; stopping");
                    break;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            match parse_cards(&html, self.cfg.max_per_page) {
                Ok(mut scraped) => {
                    tracing::debug!(target: "ingest", adapter = "naukri", page, count = scraped.len(), "page scraped");
                    if scraped.is_empty() && page == 1 {
                        failure = Some(AdapterError::SelectorNotFound {
                            selector: CARD_SELECTOR.to_string(),
                        });
                        break;
                    }
                    if scraped.is_empty() {
                        tracing::warn!(target: "ingest", adapter = "naukri", page, "page yielded no cards; stopping");
                        break;
                    }
                    records.append(&mut scraped);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        session.close().await;

        if let Some(e) = failure {
            return Err(e);
        }
        counter!("adapter_records_total", "adapter" => "naukri").increment(records.len() as u64);
        tracing::info!(target: "ingest", adapter = "naukri", count = records.len(), "scraped");
        Ok(records)
    }
}
