//! Capabilities the retrieval core consumes from the outside world.

/// Maps text to fixed-length vectors. Implementations should return
/// L2-normalized vectors, but callers normalize again before indexing.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Summary-by-title endpoint of an encyclopedia.
pub trait SummaryLookup: Send + Sync {
    /// `Ok(None)` when the title does not resolve to a page.
    fn summary(&self, title: &str) -> anyhow::Result<Option<String>>;
}

/// Structured title search of the same encyclopedia.
pub trait SearchApi: Send + Sync {
    fn search_titles(&self, query: &str, limit: usize) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// Generic web search returning result URLs in rank order.
pub trait WebSearch: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<WebHit>>;
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl FetchedPage {
    pub fn is_html_ok(&self) -> bool {
        self.status == 200 && self.content_type.to_ascii_lowercase().starts_with("text/html")
    }
}

/// Fetches a single page; implementations enforce their own timeout.
pub trait PageFetch: Send + Sync {
    fn fetch(&self, url: &str) -> anyhow::Result<FetchedPage>;
}
