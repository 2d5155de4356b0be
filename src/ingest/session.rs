// src/ingest/session.rs
//! Pre-captured session state (cookies exported from a logged-in browser).

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub http_only: Option<bool>,
}

/// Load a cookie jar from a JSON array file.
pub fn load_cookies(path: &Path) -> Result<Vec<SessionCookie>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading session cookies from {}", path.display()))?;
    parse_cookies(&content).with_context(|| format!("parsing {}", path.display()))
}

fn parse_cookies(s: &str) -> Result<Vec<SessionCookie>> {
    let cookies: Vec<SessionCookie> = serde_json::from_str(s)?;
    if let Some(bad) = cookies.iter().find(|c| c.name.trim().is_empty()) {
        return Err(anyhow!("cookie with empty name (value len {})", bad.value.len()));
    }
    Ok(cookies)
}

/// Render cookies as a `Cookie:` header value for direct HTTP fetching.
pub fn cookie_header(cookies: &[SessionCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}
