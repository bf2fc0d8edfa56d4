//! Healing: recovering text from external sources when the base index
//! cannot answer with confidence.
//!
//! The cascade is an ordered list of [`HealStrategy`] objects driven by a
//! single loop; every stage reports a tagged [`HealOutcome`] instead of
//! failing the request.

pub mod cascade;
pub mod clients;
pub mod extract;

pub use cascade::{
    title_variants, web_query, DirectLookup, HealOutcome, HealStrategy, HealingCascade, SearchApiLookup,
    SiteSearchLookup, WebFallback,
};
pub use clients::{build_http_client, DuckDuckGoSearch, HttpPageFetcher, WikipediaClient};
pub use extract::{extract_main_content, Extracted, ExtractionStrategy};
