//! Blocking HTTP implementations of the external collaborators.
//!
//! Every client shares one `reqwest` blocking client configured with the
//! fixed timeout and user agent from [`HttpSettings`]. Transport failures
//! surface as [`Error::Network`]; callers treat them as soft misses.

use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use healrag_core::config::HttpSettings;
use healrag_core::error::Error;
use healrag_core::traits::{FetchedPage, PageFetch, SearchApi, SummaryLookup, WebHit, WebSearch};

pub fn build_http_client(settings: &HttpSettings) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

fn network(e: reqwest::Error) -> Error {
    Error::Network(e.to_string())
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: SearchQuery,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

/// Summary-by-title and title search against a MediaWiki deployment.
pub struct WikipediaClient {
    http: Client,
    summary_endpoint: String,
    search_endpoint: String,
}

impl WikipediaClient {
    pub fn new(http: Client, settings: &HttpSettings) -> Self {
        Self {
            http,
            summary_endpoint: settings.summary_endpoint.trim_end_matches('/').to_string(),
            search_endpoint: settings.search_endpoint.clone(),
        }
    }
}

impl SummaryLookup for WikipediaClient {
    fn summary(&self, title: &str) -> Result<Option<String>> {
        let url = format!("{}/{}", self.summary_endpoint, urlencoding::encode(title));
        debug!(%url, "summary lookup");
        let resp = self.http.get(&url).send().map_err(network)?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Network(format!("HTTP {} for {title}", resp.status())).into());
        }
        let body: SummaryResponse = resp.json().map_err(network)?;
        Ok(Some(body.extract).filter(|e| !e.trim().is_empty()))
    }
}

impl SearchApi for WikipediaClient {
    fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let resp = self
            .http
            .get(&self.search_endpoint)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .send()
            .map_err(network)?;
        if !resp.status().is_success() {
            return Err(Error::Network(format!("HTTP {} from search API", resp.status())).into());
        }
        let body: SearchResponse = resp.json().map_err(network)?;
        Ok(body.query.search.into_iter().map(|h| h.title).collect())
    }
}

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse(".result").expect("result selector"));
static RESULT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.result__a").expect("link selector"));
static RESULT_SNIPPET: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("snippet selector"));

/// Resolve a result link to its target. Redirect links carry the target
/// percent-encoded in the `uddg` query parameter.
pub(crate) fn resolve_result_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") { format!("https:{href}") } else { href.to_string() };
    let url = Url::parse(&absolute).ok()?;
    if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Parse the HTML results page into hits, skipping ads.
pub(crate) fn parse_results(html: &str, limit: usize) -> Vec<WebHit> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT)
        .filter(|r| !r.value().attr("class").unwrap_or_default().contains("result--ad"))
        .filter_map(|r| {
            let link = r.select(&RESULT_LINK).next()?;
            let url = resolve_result_href(link.value().attr("href")?)?;
            let title = link.text().collect::<String>().trim().to_string();
            let snippet = r
                .select(&RESULT_SNIPPET)
                .next()
                .map(|s| s.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            Some(WebHit { url, title, snippet })
        })
        .take(limit)
        .collect()
}

/// Web search through the DuckDuckGo HTML endpoint.
pub struct DuckDuckGoSearch {
    http: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(http: Client, settings: &HttpSettings) -> Self {
        Self { http, endpoint: settings.web_search_endpoint.clone() }
    }
}

impl WebSearch for DuckDuckGoSearch {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<WebHit>> {
        let resp = self.http.get(&self.endpoint).query(&[("q", query)]).send().map_err(network)?;
        if !resp.status().is_success() {
            return Err(Error::Network(format!("HTTP {} from web search", resp.status())).into());
        }
        let html = resp.text().map_err(network)?;
        let hits = parse_results(&html, limit);
        debug!(query, hits = hits.len(), "web search");
        Ok(hits)
    }
}

pub struct HttpPageFetcher {
    http: Client,
}

impl HttpPageFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl PageFetch for HttpPageFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let resp = self.http.get(url).send().map_err(network)?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().map_err(network)?;
        Ok(FetchedPage { status, content_type, body })
    }
}
