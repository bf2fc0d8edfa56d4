//! The healing cascade: ordered enrichment strategies, one loop.
//!
//! Each stage decides from the sources collected so far whether it runs at
//! all, then reports [`HealOutcome`]. Failures of a single candidate (one
//! title, one URL) move on to the next candidate; a failed stage moves on
//! to the next stage. Nothing in here aborts a request.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use healrag_core::config::{ChunkingSettings, HealingSettings, NormalizeSettings, Settings};
use healrag_core::data_processor::chunk_with_source;
use healrag_core::error::Error;
use healrag_core::normalize::normalize;
use healrag_core::traits::{PageFetch, SearchApi, SummaryLookup, WebSearch};
use healrag_core::types::Chunk;

use crate::clients::{build_http_client, DuckDuckGoSearch, HttpPageFetcher, WikipediaClient};
use crate::extract::extract_main_content;

/// Tagged result of one cascade stage. `Success` carries whole recovered
/// texts with their attribution; chunking happens once the cascade ends.
#[derive(Debug)]
pub enum HealOutcome {
    Success(Vec<Chunk>),
    Miss,
    Error(Error),
}

pub trait HealStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the stage runs given the texts recovered by earlier stages.
    fn applies(&self, collected: &[Chunk]) -> bool;

    fn attempt(&self, query: &str, collected: &[Chunk]) -> HealOutcome;

    /// A success from this stage ends the cascade.
    fn halts_on_success(&self) -> bool {
        false
    }
}

fn encyclopedia_source(title: &str) -> String {
    format!("encyclopedia: {title}")
}

/// Fetch the summary of `title` and accept it if its normalized form is
/// longer than `min_len` characters.
fn accepted_summary(
    lookup: &dyn SummaryLookup,
    title: &str,
    min_len: usize,
    normalize_settings: &NormalizeSettings,
) -> Result<Option<String>> {
    let Some(extract) = lookup.summary(title)? else {
        debug!(title, "no page for title");
        return Ok(None);
    };
    let cleaned = normalize(&extract, normalize_settings);
    if cleaned.chars().count() > min_len {
        Ok(Some(cleaned))
    } else {
        debug!(title, "summary too short after normalization");
        Ok(None)
    }
}

/// Try candidates in order; return the first accepted text. Per-candidate
/// errors are logged and skipped; if nothing was accepted, the last error
/// (if any) becomes the stage outcome.
fn first_accepted<I>(candidates: I, stage: &'static str, mut try_one: impl FnMut(&str) -> Result<Option<Chunk>>) -> HealOutcome
where
    I: IntoIterator<Item = String>,
{
    let mut last_error = None;
    for candidate in candidates {
        match try_one(candidate.as_str()) {
            Ok(Some(chunk)) => return HealOutcome::Success(vec![chunk]),
            Ok(None) => {}
            Err(e) => {
                warn!(stage, candidate = %candidate, "lookup failed: {e:#}");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => HealOutcome::Error(Error::Network(format!("{e:#}"))),
        None => HealOutcome::Miss,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Title spellings tried against the summary endpoint, in order: verbatim,
/// every word capitalized, first word capitalized. Spaces become
/// underscores and repeated spellings are dropped.
pub fn title_variants(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    let verbatim = words.join("_");
    let titled = words.iter().map(|w| title_case(w)).collect::<Vec<_>>().join("_");
    let capitalized = title_case(&words.join("_"));
    let mut variants = Vec::with_capacity(3);
    for v in [verbatim, titled, capitalized] {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    }
    variants
}

/// Content words of `query` plus the configured context terms.
pub fn web_query(query: &str, settings: &HealingSettings) -> String {
    let lowered = query.to_lowercase();
    let words: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !settings.stop_words.iter().any(|s| s == w))
        .take(settings.max_query_words)
        .collect();
    let core = if words.is_empty() { query.trim().to_string() } else { words.join(" ") };
    if settings.context_terms.is_empty() {
        core
    } else {
        format!("{core} {}", settings.context_terms)
    }
}

/// Stage 1: summary lookup of the query's title spellings.
pub struct DirectLookup {
    lookup: Arc<dyn SummaryLookup>,
    min_len: usize,
    normalize: NormalizeSettings,
}

impl DirectLookup {
    pub fn new(lookup: Arc<dyn SummaryLookup>, healing: &HealingSettings, normalize: &NormalizeSettings) -> Self {
        Self { lookup, min_len: healing.min_extract_len, normalize: normalize.clone() }
    }
}

impl HealStrategy for DirectLookup {
    fn name(&self) -> &'static str {
        "direct-lookup"
    }

    fn applies(&self, _collected: &[Chunk]) -> bool {
        true
    }

    fn attempt(&self, query: &str, _collected: &[Chunk]) -> HealOutcome {
        first_accepted(title_variants(query), self.name(), |title| {
            Ok(accepted_summary(self.lookup.as_ref(), title, self.min_len, &self.normalize)?
                .map(|text| Chunk::new(text, encyclopedia_source(title))))
        })
    }

    fn halts_on_success(&self) -> bool {
        true
    }
}

/// Stage 2: structured title search, then summaries of the hits.
pub struct SearchApiLookup {
    search: Arc<dyn SearchApi>,
    lookup: Arc<dyn SummaryLookup>,
    limit: usize,
    min_len: usize,
    normalize: NormalizeSettings,
}

impl SearchApiLookup {
    pub fn new(
        search: Arc<dyn SearchApi>,
        lookup: Arc<dyn SummaryLookup>,
        healing: &HealingSettings,
        normalize: &NormalizeSettings,
    ) -> Self {
        Self { search, lookup, limit: healing.search_limit, min_len: healing.min_extract_len, normalize: normalize.clone() }
    }
}

impl HealStrategy for SearchApiLookup {
    fn name(&self) -> &'static str {
        "search-api"
    }

    fn applies(&self, collected: &[Chunk]) -> bool {
        collected.is_empty()
    }

    fn attempt(&self, query: &str, _collected: &[Chunk]) -> HealOutcome {
        let titles = match self.search.search_titles(query, self.limit) {
            Ok(titles) => titles,
            Err(e) => return HealOutcome::Error(Error::Network(format!("{e:#}"))),
        };
        info!(stage = self.name(), titles = titles.len(), "search API returned candidates");
        first_accepted(titles, self.name(), |title| {
            Ok(accepted_summary(self.lookup.as_ref(), title, self.min_len, &self.normalize)?
                .map(|text| Chunk::new(text, encyclopedia_source(title))))
        })
    }
}

/// Encyclopedia title from a `/wiki/<Title>` URL, percent-decoded, with
/// fragment and query removed.
fn title_from_url(url: &str, domain: &str) -> Option<String> {
    let marker = format!("{domain}/wiki/");
    let (_, rest) = url.split_once(&marker)?;
    let raw = rest.split(['#', '?']).next().unwrap_or_default();
    let title = urlencoding::decode(raw).ok()?.into_owned();
    (!title.is_empty()).then_some(title)
}

/// Stage 2b: web search restricted to the encyclopedia's domain, mapping
/// hits back to summary lookups.
pub struct SiteSearchLookup {
    web: Arc<dyn WebSearch>,
    lookup: Arc<dyn SummaryLookup>,
    domain: String,
    limit: usize,
    min_len: usize,
    enabled: bool,
    normalize: NormalizeSettings,
}

impl SiteSearchLookup {
    pub fn new(
        web: Arc<dyn WebSearch>,
        lookup: Arc<dyn SummaryLookup>,
        healing: &HealingSettings,
        normalize: &NormalizeSettings,
    ) -> Self {
        Self {
            web,
            lookup,
            domain: healing.skip_domain.clone(),
            limit: healing.search_limit,
            min_len: healing.min_extract_len,
            enabled: healing.site_search,
            normalize: normalize.clone(),
        }
    }
}

impl HealStrategy for SiteSearchLookup {
    fn name(&self) -> &'static str {
        "site-search"
    }

    fn applies(&self, collected: &[Chunk]) -> bool {
        self.enabled && collected.is_empty()
    }

    fn attempt(&self, query: &str, _collected: &[Chunk]) -> HealOutcome {
        let hits = match self.web.search(&format!("{query} site:{}", self.domain), self.limit) {
            Ok(hits) => hits,
            Err(e) => return HealOutcome::Error(Error::Network(format!("{e:#}"))),
        };
        let titles: Vec<String> = hits.iter().filter_map(|h| title_from_url(&h.url, &self.domain)).collect();
        info!(stage = self.name(), hits = hits.len(), titles = titles.len(), "site search returned candidates");
        first_accepted(titles, self.name(), |title| {
            Ok(accepted_summary(self.lookup.as_ref(), title, self.min_len, &self.normalize)?
                .map(|text| Chunk::new(text, encyclopedia_source(title))))
        })
    }
}

/// Stage 3: generic web search, fetching and extracting each result page.
pub struct WebFallback {
    web: Arc<dyn WebSearch>,
    fetch: Arc<dyn PageFetch>,
    healing: HealingSettings,
    normalize: NormalizeSettings,
}

impl WebFallback {
    pub fn new(
        web: Arc<dyn WebSearch>,
        fetch: Arc<dyn PageFetch>,
        healing: &HealingSettings,
        normalize: &NormalizeSettings,
    ) -> Self {
        Self { web, fetch, healing: healing.clone(), normalize: normalize.clone() }
    }

    fn extract_from(&self, url: &str) -> Result<Chunk> {
        let page = self.fetch.fetch(url)?;
        if !page.is_html_ok() {
            return Err(Error::Extraction(format!("{url} (status {}, content-type {:?})", page.status, page.content_type)).into());
        }
        let extracted = extract_main_content(&page.body, &self.normalize)
            .ok_or_else(|| Error::Extraction(url.to_string()))?;
        info!(stage = self.name(), url, strategy = ?extracted.strategy, chars = extracted.text.chars().count(), "extracted page");
        Ok(Chunk::new(extracted.text, format!("web: {url}")))
    }
}

impl HealStrategy for WebFallback {
    fn name(&self) -> &'static str {
        "web-fallback"
    }

    fn applies(&self, collected: &[Chunk]) -> bool {
        collected.len() < self.healing.web_below_sources
    }

    fn attempt(&self, query: &str, collected: &[Chunk]) -> HealOutcome {
        let search_query = web_query(query, &self.healing);
        info!(stage = self.name(), query = %search_query, "web search");
        let hits = match self.web.search(&search_query, self.healing.web_limit) {
            Ok(hits) => hits,
            Err(e) => return HealOutcome::Error(Error::Network(format!("{e:#}"))),
        };
        let mut found = Vec::new();
        for hit in hits {
            if collected.len() + found.len() >= self.healing.max_sources {
                break;
            }
            if hit.url.contains(&self.healing.skip_domain) {
                debug!(url = %hit.url, "skipping result already covered by encyclopedia stages");
                continue;
            }
            match self.extract_from(&hit.url) {
                Ok(chunk) => found.push(chunk),
                Err(e) => warn!(stage = self.name(), url = %hit.url, "{e:#}"),
            }
        }
        if found.is_empty() { HealOutcome::Miss } else { HealOutcome::Success(found) }
    }
}

pub struct HealingCascade {
    stages: Vec<Box<dyn HealStrategy>>,
    chunking: ChunkingSettings,
    min_text_len: usize,
}

impl HealingCascade {
    pub fn new(stages: Vec<Box<dyn HealStrategy>>, chunking: ChunkingSettings, min_text_len: usize) -> Self {
        Self { stages, chunking, min_text_len }
    }

    /// The standard stage order over the given collaborators.
    pub fn with_collaborators(
        lookup: Arc<dyn SummaryLookup>,
        search: Arc<dyn SearchApi>,
        web: Arc<dyn WebSearch>,
        fetch: Arc<dyn PageFetch>,
        settings: &Settings,
    ) -> Self {
        let (h, n) = (&settings.healing, &settings.normalize);
        let stages: Vec<Box<dyn HealStrategy>> = vec![
            Box::new(DirectLookup::new(lookup.clone(), h, n)),
            Box::new(SearchApiLookup::new(search, lookup.clone(), h, n)),
            Box::new(SiteSearchLookup::new(web.clone(), lookup, h, n)),
            Box::new(WebFallback::new(web, fetch, h, n)),
        ];
        Self::new(stages, settings.chunking.clone(), h.min_extract_len)
    }

    /// The standard cascade backed by live HTTP clients.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = build_http_client(&settings.http)?;
        let wiki = Arc::new(WikipediaClient::new(http.clone(), &settings.http));
        let web = Arc::new(DuckDuckGoSearch::new(http.clone(), &settings.http));
        let fetch = Arc::new(HttpPageFetcher::new(http));
        Ok(Self::with_collaborators(wiki.clone(), wiki, web, fetch, settings))
    }

    /// Run the stages in order and chunk whatever was recovered.
    ///
    /// Returns `(chunks, sources)`; both are empty when every stage missed.
    pub fn self_heal(&self, query: &str) -> (Vec<Chunk>, Vec<String>) {
        let mut collected: Vec<Chunk> = Vec::new();
        for stage in &self.stages {
            if !stage.applies(&collected) {
                debug!(stage = stage.name(), "stage not needed");
                continue;
            }
            match stage.attempt(query, &collected) {
                HealOutcome::Success(found) => {
                    info!(stage = stage.name(), texts = found.len(), "stage recovered content");
                    collected.extend(found);
                    if stage.halts_on_success() {
                        break;
                    }
                }
                HealOutcome::Miss => info!(stage = stage.name(), "{}", Error::LookupMiss(query.to_string())),
                HealOutcome::Error(e) => warn!(stage = stage.name(), "stage failed: {e}"),
            }
        }

        let sources: Vec<String> = collected.iter().map(|c| c.source.clone()).collect();
        let chunks: Vec<Chunk> = collected
            .iter()
            .filter(|c| c.text.trim().chars().count() > self.min_text_len)
            .flat_map(|c| chunk_with_source(&c.text, &c.source, &self.chunking))
            .collect();
        if chunks.is_empty() {
            warn!(query, "self-healing found no usable content");
        } else {
            info!(chunks = chunks.len(), sources = ?sources, "self-healing collected content");
        }
        (chunks, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_follow_capitalization_order() {
        assert_eq!(
            title_variants("quantum computing"),
            vec!["quantum_computing", "Quantum_Computing", "Quantum_computing"]
        );
        assert_eq!(title_variants("Rust"), vec!["Rust"]);
        assert!(title_variants("   ").is_empty());
    }

    #[test]
    fn web_query_drops_question_words() {
        let settings = HealingSettings::default();
        assert_eq!(
            web_query("What is the Quantum computing paradigm", &settings),
            "quantum computing paradigm definition explanation what is"
        );
        assert_eq!(web_query("what is", &settings), "what is definition explanation what is");
    }

    #[test]
    fn web_query_keeps_at_most_five_words() {
        let settings = HealingSettings { context_terms: String::new(), ..HealingSettings::default() };
        assert_eq!(web_query("one two three four five six seven", &settings), "one two three four five");
    }

    #[test]
    fn wiki_titles_come_from_urls() {
        assert_eq!(
            title_from_url("https://en.wikipedia.org/wiki/Quantum_computing#History", "wikipedia.org").as_deref(),
            Some("Quantum_computing")
        );
        assert_eq!(
            title_from_url("https://en.wikipedia.org/wiki/Caf%C3%A9?x=1", "wikipedia.org").as_deref(),
            Some("Café")
        );
        assert_eq!(title_from_url("https://example.com/wiki/Foo", "wikipedia.org"), None);
    }
}
