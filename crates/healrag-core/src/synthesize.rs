//! Extractive answer synthesis: retrieved chunks in, a short deduplicated
//! answer out. No text is generated, only selected and tidied.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::config::AnswerSettings;

pub const NO_INFO_BASE: &str = "No relevant information found in the knowledge base.";
pub const NO_INFO: &str = "No relevant information found.";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static REPEATED_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])(?:\s*[.!?])+").expect("punctuation regex"));
static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket regex"));
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

/// Split after `.`, `!` or `?` when followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    sentences.push(&text[start..end]);
                    start = end;
                }
            }
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

fn strip_markup(text: &str) -> String {
    TAGS.replace_all(&BRACKETS.replace_all(text, " "), " ").into_owned()
}

fn looks_like_markup(sentence: &str) -> bool {
    sentence.starts_with('=') || sentence.starts_with('#') || sentence.starts_with('<') || sentence.starts_with('|')
}

/// Closing punctuation is not part of the key: the last fragment only gets
/// its period after dedup.
fn prefix_key(sentence: &str, width: usize) -> String {
    sentence.trim_end_matches(['.', '!', '?']).to_lowercase().chars().take(width).collect()
}

/// Build an answer from `documents`. Returns an empty string when nothing
/// survives the filters; callers substitute [`NO_INFO`] or [`NO_INFO_BASE`].
pub fn synthesize(documents: &[String], settings: &AnswerSettings) -> String {
    if documents.is_empty() {
        return String::new();
    }
    let joined = strip_markup(&documents.join(" "));
    let mut seen = HashSet::new();
    let sentences: Vec<String> = split_sentences(&joined)
        .into_iter()
        .map(|s| WHITESPACE.replace_all(s.trim(), " ").into_owned())
        .filter(|s| s.chars().count() >= settings.min_sentence_len && !looks_like_markup(s))
        .filter(|s| seen.insert(prefix_key(s, settings.dedup_prefix)))
        .take(settings.max_sentences)
        .collect();
    if sentences.is_empty() {
        return String::new();
    }

    let result = sentences.join(". ");
    let result = REPEATED_PUNCT.replace_all(&result, "$1");
    let result = strip_markup(&result);
    let mut result = WHITESPACE.replace_all(&result, " ").trim().to_string();
    if result.is_empty() {
        return result;
    }
    if !result.ends_with(['.', '!', '?']) {
        result.push('.');
    }
    result
}

/// Like [`synthesize`] but never empty.
pub fn synthesize_or(documents: &[String], settings: &AnswerSettings, fallback: &str) -> String {
    let answer = synthesize(documents, settings);
    if answer.is_empty() { fallback.to_string() } else { answer }
}
