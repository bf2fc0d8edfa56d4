use std::env;

use healrag_core::config::Config;
use healrag_core::types::QueryRequest;
use healrag_engine::{Report, ServiceContext};
use tracing_subscriber::EnvFilter;

struct Args { query: String, demo: bool, health: bool, threshold: Option<f32>, max_results: Option<usize>, use_healing: bool }

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} [--demo] [--no-heal] [--threshold <0..1>] [--max-results <n>] <query...>");
    eprintln!("       {prog} --health");
    std::process::exit(1)
}

fn parse_args() -> Args {
    let mut raw: Vec<String> = env::args().collect();
    let prog = raw.remove(0);
    let mut args = Args { query: String::new(), demo: false, health: false, threshold: None, max_results: None, use_healing: true };
    let mut words = Vec::new();
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--demo" => args.demo = true,
            "--health" => args.health = true,
            "--no-heal" => args.use_healing = false,
            "--threshold" => args.threshold = Some(it.next().and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(&prog))),
            "--max-results" => args.max_results = Some(it.next().and_then(|v| v.parse().ok()).unwrap_or_else(|| usage(&prog))),
            "-h" | "--help" => usage(&prog),
            _ => words.push(arg),
        }
    }
    args.query = words.join(" ");
    if args.query.trim().is_empty() && !args.health { usage(&prog); }
    args
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let args = parse_args();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let default_threshold = settings.retrieval.threshold;
    let default_k = settings.retrieval.k;
    let ctx = ServiceContext::bootstrap(settings)?;

    if args.health {
        println!("{}", serde_json::to_string_pretty(&ctx.health())?);
        return Ok(());
    }

    let request = QueryRequest {
        query: args.query,
        threshold: args.threshold.unwrap_or(default_threshold),
        max_results: args.max_results.unwrap_or(default_k),
        use_healing: args.use_healing,
    };
    let response = ctx.answer(&request)?;
    if args.demo {
        print!("{}", Report(&response));
    } else {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(())
}
