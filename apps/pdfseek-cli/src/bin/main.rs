use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use pdfseek_core::config::{expand_path, Config};
use pdfseek_core::types::Chunk;
use pdfseek_embed::get_default_embedder;
use pdfseek_hybrid::{HybridSearchEngine, SearchMode, SearchRequest};
use pdfseek_text::TantivyIndexer;
use pdfseek_vector::MemoryVectorIndex;

const INDEX_BATCH: usize = 256;

struct Args {
    cmd: String,
    data: PathBuf,
    query: Option<String>,
    top_k: Option<usize>,
    mode: SearchMode,
    weight: Option<f32>,
    index_dir: Option<PathBuf>,
}

fn usage(prog: &str) -> ! {
    eprintln!("Usage: {prog} <search|files|sources> <chunks.jsonl|dir> [query] [--top-k N] [--mode hybrid|semantic|keyword] [--weight W] [--index-dir DIR]");
    eprintln!("Example: {prog} files ./chunks.jsonl 'total revenue 2023' --top-k 3");
    std::process::exit(1);
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => { eprintln!("Error: {flag} requires a value"); std::process::exit(1); }
    }
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.len() < 2 { usage(&prog); }
    let cmd = args.remove(0);
    let data = expand_path(args.remove(0));

    let (mut query, mut top_k, mut mode, mut weight, mut index_dir) = (None, None, SearchMode::default(), None, None);
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" | "-k" => { top_k = Some(flag_value(&args, i, "--top-k").parse::<usize>().context("--top-k expects a count")?); i += 1; }
            "--mode" | "-m" => { mode = flag_value(&args, i, "--mode").parse()?; i += 1; }
            "--weight" | "-w" => { weight = Some(flag_value(&args, i, "--weight").parse::<f32>().context("--weight expects a number")?); i += 1; }
            "--index-dir" => { index_dir = Some(expand_path(flag_value(&args, i, "--index-dir"))); i += 1; }
            a if !a.starts_with('-') && query.is_none() => query = Some(a.to_string()),
            other => { eprintln!("Unknown argument: {other}"); usage(&prog); }
        }
        i += 1;
    }
    Ok(Args { cmd, data, query, top_k, mode, weight, index_dir })
}

/// Chunk files are JSON Lines; a directory is walked for `*.jsonl`.
fn load_chunks(path: &Path) -> anyhow::Result<Vec<Chunk>> {
    let files: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "jsonl"))
            .map(|e| e.into_path())
            .collect()
    } else {
        vec![path.to_path_buf()]
    };

    let mut chunks = Vec::new();
    for file in files {
        let text = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() { continue; }
            let chunk: Chunk = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid chunk", file.display(), n + 1))?;
            chunks.push(chunk);
        }
    }
    Ok(chunks)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let args = parse_args()?;

    let chunks = load_chunks(&args.data)?;
    if chunks.is_empty() { bail!("no chunks found in {}", args.data.display()); }

    let text = match &args.index_dir {
        Some(dir) => TantivyIndexer::new(dir.clone())?,
        None => TantivyIndexer::in_memory()?,
    };
    let engine = HybridSearchEngine::new(text, MemoryVectorIndex::new(), get_default_embedder()?)
        .with_config(config.search()?)?;

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(ProgressStyle::with_template("{spinner} indexing [{bar:40}] {pos}/{len} chunks")?.progress_chars("=> "));
    for batch in chunks.chunks(INDEX_BATCH) {
        engine.index(batch)?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    let search = engine.config();
    info!(
        chunks = engine.document_count(),
        sources = engine.sources().len(),
        oversample = search.oversample_factor,
        merge = ?search.merge_strategy,
        keyword_fallback = search.keyword_fallback,
        "corpus loaded"
    );

    let request = || -> SearchRequest {
        let query = args.query.clone().unwrap_or_else(|| { eprintln!("Error: {} needs a query", args.cmd); std::process::exit(1) });
        let mut req = SearchRequest::new(query).mode(args.mode);
        if let Some(k) = args.top_k { req = req.top_k(k); }
        if let Some(w) = args.weight { req = req.semantic_weight(w); }
        req
    };

    let out = match args.cmd.as_str() {
        "search" => serde_json::to_value(engine.search(&request())?)?,
        "files" => serde_json::to_value(engine.search_files(&request())?)?,
        "sources" => {
            let sources: Vec<_> = engine
                .sources()
                .into_iter()
                .map(|s| { let n = engine.chunks_by_source(&s).len(); json!({ "source": s, "chunks": n }) })
                .collect();
            json!({ "sources": sources, "total": engine.document_count() })
        }
        other => { eprintln!("Unknown command: {other}"); std::process::exit(1); }
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
