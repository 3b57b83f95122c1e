//! Worker entrypoint: loads configuration and municipality seeds, runs the
//! discovery → extraction → classification → resolution pipeline for each
//! seed, and exits non-zero on any fatal startup error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bess_core::model::{JobCommon, Mode};
use bess_http::HttpClient;
use bess_pdf::TextCache;
use bess_store::{BessDao, MemoryDao};
use bess_worker::job::Job;
use bess_worker::{Pipeline, RunQueue, WorkerConfig};

#[derive(Parser)]
#[command(name = "bess-worker")]
#[command(about = "Discovers, classifies, and resolves BESS planning procedures for a set of municipalities")]
struct Cli {
    /// Override CRAWL_MODE for this run.
    #[arg(long, value_enum)]
    mode: Option<CliMode>,

    /// Path to a JSON file of municipality seeds; falls back to a small built-in list.
    #[arg(long)]
    seeds: Option<PathBuf>,

    /// Override the generated run id (useful for resuming a specific run's crawl stats).
    #[arg(long)]
    run_id: Option<String>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliMode {
    Fast,
    Deep,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,bess=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = WorkerConfig::from_env().context("failed to load worker configuration")?;
    if let Some(mode) = cli.mode {
        config.mode = match mode {
            CliMode::Fast => Mode::Fast,
            CliMode::Deep => Mode::Deep,
        };
    }

    let seeds = match &cli.seeds {
        Some(path) => bess_worker::seeds::load_from_file(path).with_context(|| format!("failed to load seeds from {}", path.display()))?,
        None => bess_worker::seeds::default_seeds(),
    };
    if seeds.is_empty() {
        anyhow::bail!("no municipality seeds to crawl");
    }

    let client = HttpClient::new(config.to_client_config());
    let text_cache = TextCache::new(config.text_cache_base.clone());

    let dao: Arc<dyn BessDao> = build_dao(&config).await?;

    let run_id = cli.run_id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    let queue = RunQueue::new();
    for seed in &seeds {
        queue.push_all(
            &run_id,
            std::iter::once(Job::Municipality(JobCommon {
                run_id: run_id.clone(),
                municipality_key: seed.key.clone(),
                municipality_name: seed.name.clone(),
                entrypoint: seed.official_website_url.clone(),
                mode: config.mode,
            })),
        );
    }

    let pipeline = Pipeline {
        client: &client,
        text_cache: &text_cache,
        dao: dao.as_ref(),
    };

    while let Some(job) = queue.pop(&run_id) {
        let Job::Municipality(common) = job else {
            continue;
        };
        let seed = seeds
            .iter()
            .find(|s| s.key == common.municipality_key)
            .expect("job municipality_key is always one of the queued seeds");
        pipeline.run_municipality(seed, &run_id, common.mode).await;
    }

    tracing::info!(run_id = %run_id, municipalities = seeds.len(), "run complete");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn build_dao(config: &WorkerConfig) -> Result<Arc<dyn BessDao>> {
    match &config.database_url {
        Some(url) => {
            let dao = bess_store::PostgresDao::new(url).await.context("failed to connect to Postgres")?;
            Ok(Arc::new(dao))
        }
        None => Ok(Arc::new(MemoryDao::new())),
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_dao(config: &WorkerConfig) -> Result<Arc<dyn BessDao>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but this binary was built without the `postgres` feature; using the in-memory store");
    }
    Ok(Arc::new(MemoryDao::new()))
}
