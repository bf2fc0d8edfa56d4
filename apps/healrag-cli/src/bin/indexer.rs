use std::{env, path::PathBuf};

use healrag_core::config::{expand_path, Config};
use healrag_core::data_processor::DataProcessor;
use healrag_embed::get_default_embedder;
use healrag_vector::{load_or_build, LanceBaseStore};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    settings.validate()?;
    let data_dir: Option<PathBuf> = env::args().nth(1).map(PathBuf::from).or_else(|| settings.cache.data_dir.as_ref().map(expand_path));

    println!("Base Index Builder\n==================");
    match &data_dir { Some(dir) => println!("Data directory: {}", dir.display()), None => println!("No data directory, using the seed corpus") }

    let processor = DataProcessor::new(settings.chunking.clone());
    let chunks = match &data_dir { Some(dir) => processor.process_directory(dir)?, None => processor.process_seed() };
    if chunks.is_empty() { anyhow::bail!("no chunks to index"); }
    let chunk_count = chunks.len();

    let db_path = settings.cache.dir_path().join("lancedb");
    let store = LanceBaseStore::new(&db_path, &settings.cache.table);
    let embedder = get_default_embedder()?;
    let index = load_or_build(&store, embedder.as_ref(), true, || Ok(chunks))?;

    println!("\n✅ Indexing completed successfully!");
    println!("📊 Indexed {} chunks ({} vectors, dim {})", chunk_count, index.len(), index.index().dim());
    println!("📁 Stored at {}", db_path.display());
    println!("\n💡 To query, use: cargo run --bin healrag -- '<query>'");
    Ok(())
}
