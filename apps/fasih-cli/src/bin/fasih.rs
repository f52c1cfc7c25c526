use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fasih_core::config::{Config, Settings};
use fasih_core::types::SearchResult;
use fasih_core::Corpus;
use fasih_embed::get_default_embedder;
use fasih_hybrid::HybridRetriever;

/// Hybrid lexical and semantic search over the Seven Mu'allaqat
#[derive(Parser, Debug)]
#[command(name = "fasih")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Extra TOML config merged over config.toml and config.<env>.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Corpus JSON (overrides data.corpus_path)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Semantic index directory (overrides data.index_dir)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed the corpus and write the semantic index
    Build,
    /// Search verses
    Search {
        query: String,
        /// Number of results (defaults to retrieval.default_k)
        #[arg(short = 'k', long = "top-k")]
        k: Option<usize>,
        /// Minimum score (defaults to retrieval.default_threshold)
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(long)]
        json: bool,
    },
    /// List poets with their odes and verse counts
    Poets {
        #[arg(long)]
        json: bool,
    },
    /// Show corpus and index status
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load_with(cli.config.as_deref()).context("loading configuration")?;
    let settings = config.settings()?;
    let corpus_path = cli.corpus.clone().unwrap_or_else(|| settings.data.corpus_path());
    let index_dir = cli.index.clone().unwrap_or_else(|| settings.data.index_dir());

    let rt = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Build => {
            let embedder = get_default_embedder(&settings.embedding)?;
            let retriever = rt.block_on(fasih_hybrid::build(&corpus_path, &index_dir, &settings, embedder))?;
            let stats = retriever.stats();
            let pruned = fasih_hybrid::prune_versions(&index_dir)?;
            tracing::debug!(pruned, "removed superseded index versions");
            println!("Indexed {} verses by {} poets into {}", stats.records, stats.poets, index_dir.display());
        }
        Commands::Search { query, k, threshold, json } => {
            let retriever = rt.block_on(open_retriever(&settings, &corpus_path, &index_dir))?;
            let k = k.unwrap_or(settings.retrieval.default_k);
            let threshold = threshold.unwrap_or(settings.retrieval.default_threshold);
            let results = rt.block_on(retriever.search(&query, k, threshold))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&query, &results);
            }
        }
        Commands::Poets { json } => {
            let poets = Corpus::load(&corpus_path)?.poets();
            if json {
                println!("{}", serde_json::to_string_pretty(&poets)?);
            } else {
                for poet in &poets {
                    println!("{} ({} verses): {}", poet.name, poet.verse_count, poet.poems.join("، "));
                }
            }
        }
        Commands::Stats { json } => {
            let retriever = rt.block_on(open_retriever(&settings, &corpus_path, &index_dir))?;
            let stats = retriever.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("records:  {}", stats.records);
                println!("poets:    {}", stats.poets);
                println!("lexical:  {}", if stats.lexical_ready { "ready" } else { "missing" });
                println!("semantic: {}", if stats.semantic_ready { "ready" } else { "unavailable" });
            }
        }
    }
    Ok(())
}

/// Full retriever when an embedder is available, lexical-only otherwise.
async fn open_retriever(settings: &Settings, corpus_path: &Path, index_dir: &Path) -> Result<HybridRetriever> {
    match get_default_embedder(&settings.embedding) {
        Ok(embedder) => fasih_hybrid::load(corpus_path, index_dir, settings, embedder).await,
        Err(e) => {
            tracing::warn!(error = %e, "no embedder; lexical search only");
            let mut retriever: HybridRetriever = HybridRetriever::new(settings.retrieval.clone());
            retriever.build_lexical(Corpus::load(corpus_path)?)?;
            Ok(retriever)
        }
    }
}

fn print_results(query: &str, results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results for '{query}'");
        return;
    }
    for (rank, result) in results.iter().enumerate() {
        let record = &result.record;
        println!(
            "{}. [{} {:.3}] {} - {} #{}",
            rank + 1,
            result.retrieval_source,
            result.score,
            record.poet_name,
            record.poem_name,
            record.verse_number
        );
        println!("   {}", record.verse_text);
        if !result.explanation.is_empty() {
            println!("   {}", result.explanation);
        }
    }
}
