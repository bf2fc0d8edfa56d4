//! Text normalizer for fetched content.
//!
//! Turns arbitrary scraped or API text into chunk-ready prose, or rejects it.
//! The length gate at the end is the only mechanism that keeps noisy pages
//! out of the heal index.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::NormalizeSettings;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static URLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("url regex"));
static EMAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+").expect("email regex"));
static MD_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)#{1,6}\s").expect("header regex"));
static MD_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"={2,}|-{3,}|\*{3,}").expect("rule regex"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:\-()'"&%$#]"#).expect("charset regex"));

/// Boilerplate phrases removed case-insensitively on word boundaries.
pub const BOILERPLATE: &[&str] = &[
    "accept all cookies",
    "manage preferences",
    "we value your privacy",
    "essential cookies",
    "privacy policy",
    "cookie policy",
    "cookies",
    "cookie",
    "skip to main content",
    "skip to main",
    "skip to content",
    "main menu",
    "toggle navigation",
    "navigation",
    "menu",
    "subscribe",
    "newsletter",
    "sign up",
    "sign in",
    "log in",
    "login",
    "register",
    "follow us",
    "share on",
    "share this",
    "tweet",
    "facebook",
    "instagram",
    "linkedin",
    "twitter",
    "all rights reserved",
    "related articles",
    "you may also like",
    "read more",
    "click here",
    "advertisement",
];

static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = BOILERPLATE.iter().map(|p| regex::escape(p)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b|(?i)copyright.*?copyright")).expect("boilerplate regex")
});

/// Words of two characters or fewer survive only if listed here.
pub const SHORT_WORDS: &[&str] = &["a", "an", "is", "to", "in", "on", "at", "be", "as", "or", "if", "it", "we", "ai", "of"];

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn keep_word(word: &str) -> bool {
    word.chars().count() > 2 || SHORT_WORDS.iter().any(|w| word.eq_ignore_ascii_case(w))
}

/// Normalize `text`, returning an empty string when fewer than
/// `settings.min_len` characters of prose remain.
pub fn normalize(text: &str, settings: &NormalizeSettings) -> String {
    let text = collapse(text);
    let text = URLS.replace_all(&text, " ");
    let text = EMAILS.replace_all(&text, " ");
    let text = BOILERPLATE_RE.replace_all(&text, " ");
    let text = MD_HEADER.replace_all(&text, " ");
    let text = MD_RULE.replace_all(&text, " ");
    let text = DISALLOWED.replace_all(&text, " ");
    let text = collapse(&text);
    let text = text.split(' ').filter(|w| keep_word(w)).collect::<Vec<_>>().join(" ");
    if text.chars().count() < settings.min_len {
        return String::new();
    }
    text
}

/// Whitespace and URL stripping only, for the last-resort extraction path.
pub fn minimal_clean(text: &str) -> String {
    collapse(&URLS.replace_all(&collapse(text), " "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> String {
        normalize(text, &NormalizeSettings::default())
    }

    #[test]
    fn short_results_are_rejected() {
        assert_eq!(norm("Too short to matter."), "");
        assert_eq!(norm(""), "");
    }

    #[test]
    fn strips_urls_emails_and_boilerplate() {
        let raw = "Accept all cookies\n\nQuantum computing uses qubits (see https://example.com/q) \
                   to perform computation. Contact someone@example.com. Subscribe to our newsletter! \
                   Superposition and entanglement are central.";
        let out = norm(raw);
        assert!(!out.to_lowercase().contains("cookies"));
        assert!(!out.contains("https"));
        assert!(!out.contains('@'));
        assert!(!out.to_lowercase().contains("newsletter"));
        assert!(out.starts_with("Quantum computing uses qubits"));
        assert!(out.contains("Superposition and entanglement are central."));
    }

    #[test]
    fn boilerplate_is_matched_on_word_boundaries() {
        let raw = "The menu bar is gone, but menus and tweeting adverbs remain in this long sentence.";
        let out = norm(raw);
        assert!(!out.contains("menu bar"));
        assert!(out.contains("menus"));
        assert!(out.contains("tweeting"));
    }

    #[test]
    fn drops_noise_words_but_keeps_allow_list() {
        let raw = "It is x y zz an example of AI in practice, as we go on to see at length here.";
        let out = norm(raw);
        assert!(!out.contains(" x "));
        assert!(!out.contains("zz"));
        assert!(out.contains("It is an example of AI in practice"));
    }

    #[test]
    fn strips_markdown_headers_and_rules() {
        let raw = "## Overview\n=====\nRust guarantees memory safety without a garbage collector in most programs.";
        let out = norm(raw);
        assert!(!out.contains('#'));
        assert!(!out.contains("=="));
        assert!(out.starts_with("Overview Rust guarantees"));
    }

    #[test]
    fn minimal_clean_only_touches_whitespace_and_urls() {
        let out = minimal_clean("  Cookie   banner\nhttp://x.y/z text  ");
        assert_eq!(out, "Cookie banner text");
    }
}
