use anyhow::{anyhow, Result};
use axum::Router;
use clap::Parser;
use engine::{BackendKind, EngineConfig, ResolveMode, TfidfConfig};
use server::lookup::{JikanLookup, TitleLookup};
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory holding anime.csv, manga.csv and manhwa.csv
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
    /// Extra or replacement corpus as key=path (repeatable)
    #[arg(long = "corpus", value_parser = parse_corpus)]
    corpora: Vec<(String, PathBuf)>,
    /// Similarity backend: tfidf or hashed
    #[arg(long, default_value = "tfidf")]
    backend: BackendKind,
    /// Title resolution: strict or fuzzy
    #[arg(long, default_value = "strict")]
    mode: ResolveMode,
    #[arg(long, default_value_t = 0.4)]
    cutoff: f64,
    /// Upstream lookup timeout seconds
    #[arg(long, default_value_t = 10)]
    lookup_timeout_secs: u64,
    /// Disable the upstream lookup fallback
    #[arg(long, default_value_t = false)]
    no_lookup: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

fn parse_corpus(s: &str) -> Result<(String, PathBuf)> {
    let (key, path) = s.split_once('=').ok_or_else(|| anyhow!("expected key=path, got {s}"))?;
    Ok((key.trim().to_lowercase(), PathBuf::from(path.trim())))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut corpora = ServerConfig::media_defaults(&args.data_dir);
    for (key, path) in args.corpora {
        corpora.retain(|(k, _)| *k != key);
        corpora.push((key, path));
    }
    let config = ServerConfig {
        corpora,
        engine: EngineConfig {
            backend: args.backend,
            tfidf: TfidfConfig::default(),
            resolve_mode: args.mode,
            fuzzy_cutoff: args.cutoff,
        },
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };
    let lookup: Option<Arc<dyn TitleLookup>> = if args.no_lookup {
        None
    } else {
        Some(Arc::new(JikanLookup::new(Duration::from_secs(args.lookup_timeout_secs))?))
    };

    let app: Router = build_app(config, lookup)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
