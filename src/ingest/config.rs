// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/aggregator.toml";
pub const DEFAULT_JSON_PATH: &str = "config/aggregator.json";

/// Which page-loading substrate an adapter uses.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Webdriver,
    Http,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebDriverConfig {
    pub url: String,
    pub headless: bool,
    pub block_assets: bool,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            headless: true,
            block_assets: true,
        }
    }
}

/// Settings for one external source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub enabled: bool,
    pub keyword: String,
    pub location: String,
    pub pages: u32,
    pub max_per_page: usize,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
    pub nav_timeout_secs: u64,
    pub wait_timeout_secs: u64,
    pub cookies_path: Option<PathBuf>,
    pub fetcher: FetcherKind,
}

/// A source table as written in the config file. Keys left out keep the
/// source's own default; `cookies_path = ""` turns the session off.
#[derive(Debug, Default, Deserialize)]
struct SourceOverrides {
    enabled: Option<bool>,
    keyword: Option<String>,
    location: Option<String>,
    pages: Option<u32>,
    max_per_page: Option<usize>,
    cache_ttl_secs: Option<u64>,
    timeout_secs: Option<u64>,
    nav_timeout_secs: Option<u64>,
    wait_timeout_secs: Option<u64>,
    cookies_path: Option<PathBuf>,
    fetcher: Option<FetcherKind>,
}

impl SourceOverrides {
    fn apply(self, base: SourceConfig) -> SourceConfig {
        SourceConfig {
            enabled: self.enabled.unwrap_or(base.enabled),
            keyword: self.keyword.unwrap_or(base.keyword),
            location: self.location.unwrap_or(base.location),
            pages: self.pages.unwrap_or(base.pages),
            max_per_page: self.max_per_page.unwrap_or(base.max_per_page),
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or(base.cache_ttl_secs),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
            nav_timeout_secs: self.nav_timeout_secs.unwrap_or(base.nav_timeout_secs),
            wait_timeout_secs: self.wait_timeout_secs.unwrap_or(base.wait_timeout_secs),
            cookies_path: match self.cookies_path {
                Some(p) if p.as_os_str().is_empty() => None,
                Some(p) => Some(p),
                None => base.cookies_path,
            },
            fetcher: self.fetcher.unwrap_or(base.fetcher),
        }
    }
}

impl SourceConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn linkedin_default() -> Self {
        Self {
            enabled: true,
            keyword: "intern".to_string(),
            location: "India".to_string(),
            pages: 1,
            max_per_page: 10,
            cache_ttl_secs: 60 * 60,
            timeout_secs: 60,
            nav_timeout_secs: 20,
            wait_timeout_secs: 10,
            cookies_path: Some(PathBuf::from("config/cookies/linkedin.json")),
            fetcher: FetcherKind::Webdriver,
        }
    }

    pub fn internshala_default() -> Self {
        Self {
            enabled: true,
            keyword: String::new(),
            location: String::new(),
            pages: 1,
            max_per_page: 10,
            cache_ttl_secs: 15 * 60,
            timeout_secs: 60,
            nav_timeout_secs: 30,
            wait_timeout_secs: 15,
            cookies_path: Some(PathBuf::from("config/cookies/internshala.json")),
            fetcher: FetcherKind::Webdriver,
        }
    }

    pub fn naukri_default() -> Self {
        Self {
            enabled: true,
            keyword: "remote".to_string(),
            location: String::new(),
            pages: 1,
            max_per_page: 10,
            cache_ttl_secs: 10 * 60,
            timeout_secs: 120,
            nav_timeout_secs: 60,
            wait_timeout_secs: 15,
            cookies_path: None,
            fetcher: FetcherKind::Webdriver,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "SourceTables")]
pub struct SourcesConfig {
    pub linkedin: SourceConfig,
    pub internshala: SourceConfig,
    pub naukri: SourceConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceTables {
    linkedin: SourceOverrides,
    internshala: SourceOverrides,
    naukri: SourceOverrides,
}

impl From<SourceTables> for SourcesConfig {
    fn from(t: SourceTables) -> Self {
        Self {
            linkedin: t.linkedin.apply(SourceConfig::linkedin_default()),
            internshala: t.internshala.apply(SourceConfig::internshala_default()),
            naukri: t.naukri.apply(SourceConfig::naukri_default()),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            linkedin: SourceConfig::linkedin_default(),
            internshala: SourceConfig::internshala_default(),
            naukri: SourceConfig::naukri_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct AggregatorConfig {
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AggregatorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading aggregator config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $AGGREGATOR_CONFIG_PATH
/// 2) config/aggregator.toml
/// 3) config/aggregator.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<AggregatorConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON_PATH);
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(AggregatorConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AggregatorConfig> {
    match hint_ext {
        "toml" => toml::from_str(s).context("parsing aggregator toml"),
        "json" => serde_json::from_str(s).context("parsing aggregator json"),
        _ => toml::from_str(s)
            .or_else(|_| serde_json::from_str(s))
            .map_err(|_| anyhow!("unsupported aggregator config format")),
    }
}

/// Postgres URL from `DATABASE_URL`, or assembled from the `DB_*` parts.
pub fn database_url_from_env() -> Result<String> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }
    let part = |name: &str| {
        std::env::var(name).with_context(|| format!("{name} not set (and no DATABASE_URL)"))
    };
    let user = part("DB_USER")?;
    let password = std::env::var("DB_PASSWORD").unwrap_or_default();
    let host = part("DB_HOST")?;
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let port: u16 = port
        .trim()
        .parse()
        .with_context(|| format!("DB_PORT is not a port number: {port}"))?;
    let name = part("DB_NAME")?;
    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}
