//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_MERGE__REPLACE_RATIO=1.2`).
//! Every tunable of the retrieval core has a default, so an absent config
//! file yields a working [`Settings`].

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Build a config from an explicit figment (tests, embedding hosts).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract::<Settings>()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalSettings,
    pub merge: MergeSettings,
    pub answer: AnswerSettings,
    pub normalize: NormalizeSettings,
    pub chunking: ChunkingSettings,
    pub healing: HealingSettings,
    pub http: HttpSettings,
    pub cache: CacheSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.chunking.overlap >= self.chunking.size {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than chunking.size ({})",
                self.chunking.overlap, self.chunking.size
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.threshold) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.threshold must be in [0, 1], got {}",
                self.retrieval.threshold
            )));
        }
        if self.retrieval.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
    /// Per-result similarity floor; only scores strictly above it count.
    pub score_floor: f32,
    /// Default healing threshold when a request does not carry one.
    pub threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 5, score_floor: 0.15, threshold: 0.5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    pub replace_ratio: f32,
    pub weak_base: f32,
    pub merge_ratio: f32,
    pub base_weight: f32,
    pub heal_weight: f32,
    pub dedup_prefix: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            replace_ratio: 1.15,
            weak_base: 0.3,
            merge_ratio: 0.9,
            base_weight: 0.3,
            heal_weight: 0.7,
            dedup_prefix: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    pub max_sentences: usize,
    pub min_sentence_len: usize,
    pub dedup_prefix: usize,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self { max_sentences: 5, min_sentence_len: 30, dedup_prefix: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    pub min_len: usize,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self { min_len: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { size: 500, overlap: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealingSettings {
    /// Minimum normalized length of an encyclopedia extract.
    pub min_extract_len: usize,
    pub search_limit: usize,
    pub web_limit: usize,
    pub max_sources: usize,
    /// The web fallback runs only while fewer sources than this were found.
    pub web_below_sources: usize,
    pub max_query_words: usize,
    pub context_terms: String,
    pub stop_words: Vec<String>,
    pub skip_domain: String,
    pub site_search: bool,
}

impl Default for HealingSettings {
    fn default() -> Self {
        Self {
            min_extract_len: 50,
            search_limit: 3,
            web_limit: 5,
            max_sources: 3,
            web_below_sources: 2,
            max_query_words: 5,
            context_terms: "definition explanation what is".to_string(),
            stop_words: ["what", "is", "are", "how", "does", "the", "a", "an"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            skip_domain: "wikipedia.org".to_string(),
            site_search: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub summary_endpoint: String,
    pub search_endpoint: String,
    pub web_search_endpoint: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "healrag/0.1 (self-healing retrieval)".to_string(),
            summary_endpoint: "https://en.wikipedia.org/api/rest_v1/page/summary".to_string(),
            search_endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            web_search_endpoint: "https://html.duckduckgo.com/html/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: String,
    pub table: String,
    pub rebuild: bool,
    /// Optional directory of `.txt` files used when building the base index.
    pub data_dir: Option<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { dir: ".cache".to_string(), table: "base_chunks".to_string(), rebuild: false, data_dir: None }
    }
}

impl CacheSettings {
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
