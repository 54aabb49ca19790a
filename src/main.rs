pub mod config;
pub mod graph_linker;
pub mod index;
pub mod maven;
pub mod miner;
pub mod pom;
pub mod resolver;
pub mod storage;
pub mod util;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::MinerConfig;
use crate::graph_linker::GraphLinker;
use crate::index::ArtifactIndex;
use crate::maven::DescriptorFetcher;
use crate::maven::coordinates::ArtifactIdentifier;
use crate::maven::remote_repo::RemoteMavenRepo;
use crate::miner::{Miner, MiningReport};
use crate::miner::batch::BatchResolver;
use crate::resolver::provider::{ResolverKind, ResolverProvider};
use crate::storage::artifact_storage::{ArtifactStorage, StoredArtifact};
use crate::storage::fs_artifact_storage::FsArtifactStorage;

#[derive(Parser, Debug)]
#[command(name = "maven-miner")]
#[command(about = "Mines direct dependencies and parent relations of Maven artifacts")]
struct Args {
    /// Configuration file (TOML); defaults apply if omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of worker threads, overrides the configuration file
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Number of artifacts per batch, overrides the configuration file
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Backup resolver, overrides the configuration file
    #[arg(long, global = true, value_enum)]
    backup_resolver: Option<ResolverKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve and store all artifacts listed in an index file
    Mine {
        /// One artifact per line, as g:a:v or as repository path of its POM
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Create relations between stored artifacts
    Link,

    /// Mine, then link
    All {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Resolve a single artifact and print the result
    Resolve {
        /// g:a:v
        coordinates: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = MinerConfig::load(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config.worker_threads = workers;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if args.backup_resolver.is_some() {
        config.backup_resolver = args.backup_resolver;
    }
    config.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(run(args.command, Arc::new(config)))
}

async fn run(command: Commands, config: Arc<MinerConfig>) -> anyhow::Result<()> {
    let fetcher: Arc<dyn DescriptorFetcher> = Arc::new(RemoteMavenRepo::new(config.repository_url.clone())?);
    let storage: Arc<dyn ArtifactStorage> = Arc::new(FsArtifactStorage::new(&config.output_directory));
    let provider = ResolverProvider::new(config.clone(), fetcher.clone());

    match command {
        Commands::Mine { input } => {
            mine(&input, &config, provider, fetcher, storage).await?;
        }
        Commands::Link => {
            GraphLinker::new(storage).link().await?;
        }
        Commands::All { input } => {
            mine(&input, &config, provider, fetcher, storage.clone()).await?;
            GraphLinker::new(storage).link().await?;
        }
        Commands::Resolve { coordinates } => {
            let identifier: ArtifactIdentifier = coordinates.parse()?;
            let resolved = BatchResolver::new(&provider, fetcher, storage)
                .resolve_identifier(&identifier)
                .await?;

            let output = ResolveOutput {
                errors: resolved.result.errors.iter().map(|e| e.to_string()).collect(),
                retried_with_backup: resolved.retried_with_backup,
                artifact: StoredArtifact::from_result(&resolved.result),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

async fn mine(
    input: &Path,
    config: &MinerConfig,
    provider: ResolverProvider,
    fetcher: Arc<dyn DescriptorFetcher>,
    storage: Arc<dyn ArtifactStorage>,
) -> anyhow::Result<MiningReport> {
    let index = ArtifactIndex::read(input).await?;
    let num_artifacts = index.len();
    if index.is_empty() {
        info!("no artifacts to process in {:?}", input);
    }

    let miner = Miner::new(provider, fetcher, storage, config.worker_threads);
    let report = miner.process_artifacts(index.into_batches(config.batch_size), num_artifacts).await;

    let totals = &report.totals;
    info!("finished processing {} artifacts in {} batches after {}s", totals.num_processed, report.num_batches, report.elapsed.as_secs());
    info!("{} succeeded, {} failed, {} retried with backup resolver", totals.num_succeeded, totals.num_failed, totals.num_backup_retries);
    info!("got {} resolver errors, {} artifacts with download errors", totals.num_resolver_errors, totals.num_download_errors);

    Ok(report)
}

#[derive(Serialize)]
struct ResolveOutput {
    artifact: StoredArtifact,
    errors: Vec<String>,
    retried_with_backup: bool,
}
