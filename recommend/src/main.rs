use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use engine::{
    catalog, BackendKind, CorpusEngine, EngineConfig, RecommendQuery, RecommendResponse, ResolveMode, TfidfConfig,
    DEFAULT_TOP_N,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recommend")]
#[command(about = "Content-based recommendations over a media catalog file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Catalog file (.csv, .jsonl or .json)
    #[arg(long)]
    input: PathBuf,
    /// Similarity backend: tfidf or hashed
    #[arg(long, default_value = "tfidf")]
    backend: BackendKind,
    /// Title resolution: strict (exact, substring) or fuzzy (exact, ratio)
    #[arg(long, default_value = "strict")]
    mode: ResolveMode,
    /// Minimum ratio accepted by fuzzy resolution
    #[arg(long, default_value_t = 0.4)]
    cutoff: f64,
    /// Cap on vocabulary size
    #[arg(long, default_value_t = 50_000)]
    max_features: usize,
    /// Number of recommendations
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,
    /// Print JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every item_id and title in the catalog
    List {
        #[arg(long)]
        input: PathBuf,
    },
    /// Recommend items similar to a catalog title or item_id
    Query {
        #[command(flatten)]
        engine: EngineArgs,
        /// Title text, or an item_id when --by-id is set
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = false)]
        by_id: bool,
    },
    /// Recommend items similar to arbitrary text
    Text {
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long)]
        text: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { input } => {
            let corpus = catalog::load_path(&input)?;
            info!(path = %input.display(), items = corpus.len(), "catalog loaded");
            for item in corpus.items() {
                println!("{}: {}", item.item_id(), item.title());
            }
            Ok(())
        }
        Commands::Query { engine, query, by_id } => {
            let built = build_engine(&engine)?;
            let q = if by_id {
                RecommendQuery::ItemId(query.trim().parse().map_err(|_| anyhow!("not an item_id: {query}"))?)
            } else {
                RecommendQuery::Title(query.clone())
            };
            let resp = built
                .recommend(&q, engine.top_n)?
                .ok_or_else(|| anyhow!("no catalog title matches {query:?}"))?;
            print_response(&resp, engine.json)
        }
        Commands::Text { engine, text } => {
            let built = build_engine(&engine)?;
            let resp = built.recommend_from_text(&text, &format!("{text} (Free Text)"), engine.top_n)?;
            print_response(&resp, engine.json)
        }
    }
}

fn build_engine(args: &EngineArgs) -> Result<CorpusEngine> {
    let config = EngineConfig {
        backend: args.backend,
        tfidf: TfidfConfig { max_features: Some(args.max_features), ..Default::default() },
        resolve_mode: args.mode,
        fuzzy_cutoff: args.cutoff,
    };
    let corpus = catalog::load_path(&args.input)?;
    let key = args
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("catalog")
        .to_lowercase();
    let engine = CorpusEngine::build(key, corpus, &config)?;
    info!(corpus = engine.key(), items = engine.corpus().len(), backend = engine.backend().name(), "engine built");
    Ok(engine)
}

fn print_response(resp: &RecommendResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(resp)?);
        return Ok(());
    }
    println!("Recommendations for: {} [{}]", resp.base_title, resp.engine_used);
    println!("{:>8}  {:<40}  {:<30}  {}", "item_id", "title", "genres", "score");
    for r in &resp.recommendations {
        println!("{:>8}  {:<40}  {:<30}  {:.3}", r.item_id, r.title, r.genres, r.similarity_score);
    }
    Ok(())
}
