//! Main-content extraction from fetched HTML pages.
//!
//! Strategies run in a fixed order and the first one whose output clears
//! its threshold wins. Script, style, navigation and other page chrome
//! never contributes text to any strategy.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use healrag_core::config::NormalizeSettings;
use healrag_core::normalize::{minimal_clean, normalize};

const NOISE_TAGS: &[&str] = &["script", "style", "meta", "link", "nav", "header", "footer", "aside"];

const CONTAINER_MIN: usize = 150;
const PARAGRAPHS_MIN: usize = 200;
const BODY_RAW_MIN: usize = 200;
const BODY_MIN: usize = 150;
const MINIMAL_MIN: usize = 100;
const PARAGRAPH_MIN: usize = 50;
const MAX_PARAGRAPHS: usize = 10;
const MAX_MINIMAL_PARAGRAPHS: usize = 5;

static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main, article").expect("main selector"));
static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div[class]").expect("div selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("p selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector"));
static CONTENT_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)content|main|article|post|entry|text|body|description|paragraph").expect("class regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `<main>` or `<article>` container.
    MainContainer,
    /// `<div>` whose class looks like a content wrapper.
    ContentClass,
    /// First paragraphs that survive normalization, combined.
    Paragraphs,
    /// Whole body with page chrome removed.
    Body,
    /// Long paragraphs with whitespace and URLs stripped only.
    MinimalParagraphs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub strategy: ExtractionStrategy,
    pub text: String,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn in_noise(el: ElementRef<'_>) -> bool {
    NOISE_TAGS.contains(&el.value().name())
        || el
            .ancestors()
            .any(|n| n.value().as_element().map_or(false, |e| NOISE_TAGS.contains(&e.name())))
}

fn push_text(el: ElementRef<'_>, out: &mut Vec<String>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let t = text.trim();
            if !t.is_empty() {
                out.push(t.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !NOISE_TAGS.contains(&child_el.value().name()) {
                push_text(child_el, out);
            }
        }
    }
}

/// Text of `el` with text nodes trimmed and space-joined, skipping noise
/// subtrees.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    push_text(el, &mut parts);
    parts.join(" ")
}

fn first_container<'a, I>(candidates: I, settings: &NormalizeSettings) -> Option<String>
where
    I: Iterator<Item = ElementRef<'a>>,
{
    candidates.filter(|el| !in_noise(*el)).find_map(|el| {
        let raw = visible_text(el);
        if char_len(&raw) <= CONTAINER_MIN {
            return None;
        }
        let cleaned = normalize(&raw, settings);
        (char_len(&cleaned) > CONTAINER_MIN).then_some(cleaned)
    })
}

fn main_container(doc: &Html, settings: &NormalizeSettings) -> Option<String> {
    first_container(doc.select(&MAIN), settings)
}

fn content_class(doc: &Html, settings: &NormalizeSettings) -> Option<String> {
    let divs = doc
        .select(&DIV)
        .filter(|el| el.value().attr("class").map_or(false, |c| CONTENT_CLASS.is_match(c)));
    first_container(divs, settings)
}

fn paragraphs(doc: &Html, settings: &NormalizeSettings) -> Option<String> {
    let kept: Vec<String> = doc
        .select(&PARAGRAPH)
        .filter(|p| !in_noise(*p))
        .map(|p| normalize(&visible_text(p), settings))
        .filter(|t| char_len(t) > PARAGRAPH_MIN)
        .take(MAX_PARAGRAPHS)
        .collect();
    debug!(paragraphs = kept.len(), "paragraph strategy candidates");
    let combined = kept.join(" ");
    (char_len(&combined) > PARAGRAPHS_MIN).then_some(combined)
}

fn body(doc: &Html, settings: &NormalizeSettings) -> Option<String> {
    let body = doc.select(&BODY).next()?;
    let raw = visible_text(body);
    if char_len(&raw) <= BODY_RAW_MIN {
        return None;
    }
    let cleaned = normalize(&raw, settings);
    (char_len(&cleaned) > BODY_MIN).then_some(cleaned)
}

/// ALL-CAPS paragraphs are usually banners or legal notices.
fn is_shouting(text: &str) -> bool {
    text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase)
}

fn minimal_paragraphs(doc: &Html) -> Option<String> {
    let kept: Vec<String> = doc
        .select(&PARAGRAPH)
        .filter(|p| !in_noise(*p))
        .map(|p| WHITESPACE.replace_all(&visible_text(p), " ").trim().to_string())
        .filter(|t| char_len(t) > PARAGRAPH_MIN && !is_shouting(t))
        .take(MAX_MINIMAL_PARAGRAPHS)
        .collect();
    let combined = kept.join(" ");
    if char_len(&combined) <= MINIMAL_MIN {
        return None;
    }
    let cleaned = minimal_clean(&combined);
    (char_len(&cleaned) > MINIMAL_MIN).then_some(cleaned)
}

/// Run the extraction strategies in order and return the first success.
pub fn extract_main_content(html: &str, settings: &NormalizeSettings) -> Option<Extracted> {
    let doc = Html::parse_document(html);
    let attempts: [(ExtractionStrategy, &dyn Fn() -> Option<String>); 5] = [
        (ExtractionStrategy::MainContainer, &|| main_container(&doc, settings)),
        (ExtractionStrategy::ContentClass, &|| content_class(&doc, settings)),
        (ExtractionStrategy::Paragraphs, &|| paragraphs(&doc, settings)),
        (ExtractionStrategy::Body, &|| body(&doc, settings)),
        (ExtractionStrategy::MinimalParagraphs, &|| minimal_paragraphs(&doc)),
    ];
    for (strategy, attempt) in attempts {
        if let Some(text) = attempt() {
            debug!(?strategy, chars = char_len(&text), "extraction succeeded");
            return Some(Extracted { strategy, text });
        }
        debug!(?strategy, "extraction strategy below threshold");
    }
    None
}
