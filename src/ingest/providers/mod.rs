// src/ingest/providers/mod.rs
pub mod internshala;
pub mod linkedin;
pub mod naukri;

use rand::distr::Alphanumeric;
use rand::Rng;
use url::Url;

use crate::ingest::browser::{PageFetcher, PageLoad};
use crate::ingest::clean_text;
use crate::ingest::config::SourceConfig;
use crate::ingest::session::{load_cookies, SessionCookie};
use crate::ingest::types::AdapterError;

/// Source-prefixed pseudo-unique id, e.g. `li-k3f9x2a`.
/// External sites expose no stable identifier, so this is random per scrape.
pub fn synth_id(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{prefix}-{suffix}")
}

/// Resolve `href` against `base`; empty input stays empty.
pub fn absolutize(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_default()
}

pub(crate) fn selector(css: &str) -> Result<scraper::Selector, AdapterError> {
    scraper::Selector::parse(css)
        .map_err(|e| AdapterError::Extraction(format!("bad selector `{css}`: {e}")))
}

/// Cleaned text of the first element matching `sel` inside `el`, or "".
pub(crate) fn text_of(el: &scraper::ElementRef<'_>, sel: &scraper::Selector) -> String {
    el.select(sel)
        .next()
        .map(|e| clean_text(&e.text().collect::<String>()))
        .unwrap_or_default()
}

/// `href` of the first element matching `sel` inside `el`, or "".
pub(crate) fn href_of(el: &scraper::ElementRef<'_>, sel: &scraper::Selector) -> String {
    el.select(sel)
        .next()
        .and_then(|e| e.value().attr("href"))
        .unwrap_or_default()
        .to_string()
}

/// Session cookies for a source, if it is configured with a cookie file.
pub(crate) fn load_session(cfg: &SourceConfig) -> Result<Vec<SessionCookie>, AdapterError> {
    match &cfg.cookies_path {
        None => Ok(Vec::new()),
        Some(p) => load_cookies(p).map_err(|e| AdapterError::Session(format!("{e:#}"))),
    }
}

/// Open a session, load one page, always close the session.
pub(crate) async fn load_one_page(
    fetcher: &dyn PageFetcher,
    origin: &str,
    cookies: &[SessionCookie],
    page: PageLoad<'_>,
) -> Result<String, AdapterError> {
    let mut session = fetcher.open(origin, cookies, page.nav_timeout).await?;
    let html = session.load(&page).await;
    session.close().await;
    html
}
