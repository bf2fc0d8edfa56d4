use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::ChunkingSettings;
use crate::types::Chunk;

/// Split text into fixed-size character windows that overlap by
/// `overlap` characters. Windows are measured in chars, never bytes.
pub fn chunk_text(text: &str, settings: &ChunkingSettings) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = settings.size.saturating_sub(settings.overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + settings.size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }
    chunks
}

/// Chunk a recovered text and attribute every window to `source`.
pub fn chunk_with_source(text: &str, source: &str, settings: &ChunkingSettings) -> Vec<Chunk> {
    chunk_text(text, settings).into_iter().map(|t| Chunk::new(t, source)).collect()
}

/// Seed sentences used when no corpus directory is configured.
pub const SEED_CORPUS: &[&str] = &[
    "Self-healing retrieval consults external sources when the local knowledge base cannot answer a question with confidence.",
    "Machine learning helps in building intelligent applications that improve from data.",
    "Natural language processing enables computers to understand human language.",
    "Rust is a systems programming language focused on safety, speed and concurrency.",
    "Vector databases store and retrieve high-dimensional vectors efficiently.",
];

/// Turns a corpus (a directory of `.txt` files, or the seed list) into
/// base-index chunks.
#[derive(Default)]
pub struct DataProcessor {
    chunking: ChunkingSettings,
}

impl DataProcessor {
    pub fn new(chunking: ChunkingSettings) -> Self { Self { chunking } }

    pub fn process_seed(&self) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = SEED_CORPUS
            .iter()
            .flat_map(|t| chunk_with_source(t, crate::types::BASE_SOURCE, &self.chunking))
            .collect();
        info!(chunks = chunks.len(), "Built seed corpus");
        chunks
    }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let files = self.list_txt_files(data_dir);
        if files.is_empty() {
            info!("No .txt files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let content = self.read_file_content(file_path)?;
            let source = format!("{}: {}", crate::types::BASE_SOURCE, self.doc_name(file_path, data_dir));
            for paragraph in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
                all_chunks.extend(chunk_with_source(paragraph, &source, &self.chunking));
            }
        }
        info!("Processed {} files into {} chunks", files.len(), all_chunks.len());
        Ok(all_chunks)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn doc_name(&self, file_path: &Path, data_dir: &Path) -> String {
        file_path.strip_prefix(data_dir).unwrap_or(file_path).to_string_lossy().to_string()
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path(); if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort(); txt_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(size: usize, overlap: usize) -> ChunkingSettings {
        ChunkingSettings { size, overlap }
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(chunk_text("hello", &settings(500, 50)), vec!["hello".to_string()]);
        assert!(chunk_text("", &settings(500, 50)).is_empty());
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let text: String = ('a'..='z').cycle().take(1000).collect();
        let chunks = chunk_text(&text, &settings(500, 50));
        // starts at 0, 450, 900
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(&chunks[0][450..], &chunks[1][..50]);
        assert_eq!(chunks[2].chars().count(), 100);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "é".repeat(12);
        let chunks = chunk_text(&text, &settings(5, 1));
        assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'é')));
        assert_eq!(chunks[0].chars().count(), 5);
    }
}
