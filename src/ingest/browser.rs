// src/ingest/browser.rs
//! Page-loading substrate behind the source adapters.
//!
//! Adapters only ask for "the HTML of this URL once `selector` exists". Two
//! implementations: a WebDriver-controlled headless Chrome, and a plain HTTP
//! client for sites that render server-side.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thirtyfour::prelude::*;
use thirtyfour::{ChromeCapabilities, Cookie};

use crate::ingest::session::{cookie_header, SessionCookie};
use crate::ingest::types::AdapterError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One page to load within an open session.
#[derive(Debug, Clone)]
pub struct PageLoad<'a> {
    pub url: &'a str,
    /// CSS selector that must match before the page counts as loaded.
    pub wait_for: &'a str,
    pub nav_timeout: Duration,
    pub wait_timeout: Duration,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Open a session against `origin`, installing `cookies` first.
    async fn open(
        &self,
        origin: &str,
        cookies: &[SessionCookie],
        nav_timeout: Duration,
    ) -> Result<Box<dyn PageSession>, AdapterError>;
}

#[async_trait]
pub trait PageSession: Send {
    /// Load a page and return its HTML once `wait_for` matches.
    /// A page where the selector never appears yields `SelectorNotFound`.
    async fn load(&mut self, page: &PageLoad<'_>) -> Result<String, AdapterError>;
    async fn close(self: Box<Self>);
}

fn driver_err(e: WebDriverError) -> AdapterError {
    AdapterError::Driver(e.to_string())
}

/// Whether `selector` matches anything in `html`.
pub fn html_has_match(html: &str, selector: &str) -> Result<bool, AdapterError> {
    let sel = scraper::Selector::parse(selector)
        .map_err(|e| AdapterError::Extraction(format!("bad selector `{selector}`: {e}")))?;
    let doc = scraper::Html::parse_document(html);
    let found = doc.select(&sel).next().is_some();
    Ok(found)
}

// ------------------------------------------------------------
// WebDriver (chromedriver)
// ------------------------------------------------------------

pub struct WebDriverFetcher {
    server_url: String,
    headless: bool,
    block_assets: bool,
}

impl WebDriverFetcher {
    pub fn new(server_url: impl Into<String>, headless: bool, block_assets: bool) -> Self {
        Self {
            server_url: server_url.into(),
            headless,
            block_assets,
        }
    }

    fn capabilities(&self) -> WebDriverResult<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--window-size=1920,1080".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            format!("--user-agent={USER_AGENT}"),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if self.block_assets {
            args.push("--blink-settings=imagesEnabled=false".to_string());
            caps.add_chrome_option(
                "prefs",
                json!({
                    "profile.managed_default_content_settings.images": 2,
                    "profile.managed_default_content_settings.stylesheets": 2,
                    "webkit.webprefs.fonts_enabled": false,
                }),
            )?;
        }
        caps.add_chrome_option("args", args)?;
        Ok(caps)
    }
}

fn webdriver_cookie(c: &SessionCookie) -> Cookie<'static> {
    let mut cookie = Cookie::new(c.name.clone(), c.value.clone());
    if let Some(domain) = &c.domain {
        cookie.set_domain(domain.clone());
    }
    if let Some(path) = &c.path {
        cookie.set_path(path.clone());
    }
    if let Some(secure) = c.secure {
        cookie.set_secure(secure);
    }
    cookie
}

async fn navigate(driver: &WebDriver, url: &str, timeout: Duration) -> Result<(), AdapterError> {
    match tokio::time::timeout(timeout, driver.goto(url)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AdapterError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(AdapterError::Timeout(timeout)),
    }
}

#[async_trait]
impl PageFetcher for WebDriverFetcher {
    async fn open(
        &self,
        origin: &str,
        cookies: &[SessionCookie],
        nav_timeout: Duration,
    ) -> Result<Box<dyn PageSession>, AdapterError> {
        let caps = self.capabilities().map_err(driver_err)?;
        let driver = WebDriver::new(&self.server_url, caps)
            .await
            .map_err(driver_err)?;

        if !cookies.is_empty() {
            // Cookies can only be set for the domain of the current document.
            let installed = async {
                navigate(&driver, origin, nav_timeout).await?;
                for c in cookies {
                    let cookie = webdriver_cookie(c);
                    driver.add_cookie(cookie).await.map_err(|e| {
                        AdapterError::Session(format!("cookie `{}` rejected: {e}", c.name))
                    })?;
                }
                Ok::<(), AdapterError>(())
            }
            .await;

            if let Err(e) = installed {
                if let Err(quit) = driver.quit().await {
                    tracing::warn!(error = %quit, "failed to quit browser");
                }
                return Err(e);
            }
            tracing::debug!(origin, cookies = cookies.len(), "session cookies installed");
        }

        Ok(Box::new(WebDriverSession { driver }))
    }
}

struct WebDriverSession {
    driver: WebDriver,
}

#[async_trait]
impl PageSession for WebDriverSession {
    async fn load(&mut self, page: &PageLoad<'_>) -> Result<String, AdapterError> {
        navigate(&self.driver, page.url, page.nav_timeout).await?;

        self.driver
            .query(By::Css(page.wait_for))
            .wait(page.wait_timeout, POLL_INTERVAL)
            .first()
            .await
            .map_err(|_| AdapterError::SelectorNotFound {
                selector: page.wait_for.to_string(),
            })?;

        self.driver.source().await.map_err(driver_err)
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.driver.quit().await {
            tracing::warn!(error = %e, "failed to quit browser");
        }
    }
}

// ------------------------------------------------------------
// Direct HTTP
// ------------------------------------------------------------

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn open(
        &self,
        _origin: &str,
        cookies: &[SessionCookie],
        _nav_timeout: Duration,
    ) -> Result<Box<dyn PageSession>, AdapterError> {
        let cookie = (!cookies.is_empty()).then(|| cookie_header(cookies));
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            cookie,
        }))
    }
}

struct HttpSession {
    client: reqwest::Client,
    cookie: Option<String>,
}

#[async_trait]
impl PageSession for HttpSession {
    async fn load(&mut self, page: &PageLoad<'_>) -> Result<String, AdapterError> {
        let mut req = self.client.get(page.url).timeout(page.nav_timeout);
        if let Some(c) = &self.cookie {
            req = req.header(reqwest::header::COOKIE, c);
        }

        let nav_err = |reason: String| AdapterError::Navigation {
            url: page.url.to_string(),
            reason,
        };
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout(page.nav_timeout)
            } else {
                nav_err(e.to_string())
            }
        })?;
        if !resp.status().is_success() {
            return Err(nav_err(format!("HTTP {}", resp.status())));
        }
        let body = resp.text().await.map_err(|e| nav_err(e.to_string()))?;

        if !html_has_match(&body, page.wait_for)? {
            return Err(AdapterError::SelectorNotFound {
                selector: page.wait_for.to_string(),
            });
        }
        Ok(body)
    }

    async fn close(self: Box<Self>) {}
}
