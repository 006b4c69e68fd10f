//! buildsmith command-line interface.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use buildsmith_core::{
    BuildRequest, JobRecord, JobService, JobStatus, ProcessBuildRunner, Release, ReleaseSync,
    ShortId,
};
use buildsmith_store::{FsArtifactStore, FsCatalogSource, FsIndexStore, IndexStore};

use config::Config;

#[derive(Parser)]
#[command(name = "buildsmith", about = "Custom library build service", version)]
struct Cli {
    /// Release root directory.
    #[arg(long, env = "BUILDSMITH_ROOT", default_value = "releases")]
    root: PathBuf,

    /// Path to the configuration file.
    #[arg(long, env = "BUILDSMITH_CONFIG", default_value = "buildsmith.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile configured releases: remove stale ones, fetch new ones.
    Sync,

    /// List persisted releases, most recently updated first.
    Releases,

    /// Submit a build request and print the resulting job record.
    Build {
        /// Release name.
        release: String,

        /// Path to a JSON build request ({"symbols": [...], "defines": {...}}).
        #[arg(long)]
        request: PathBuf,

        /// Exit once the job is Pending instead of waiting for completion.
        /// The detached build only survives as long as this process does.
        #[arg(long)]
        no_wait: bool,
    },

    /// Show a single job record.
    Job { release: String, short_id: String },

    /// List all jobs for a release.
    Jobs { release: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BUILDSMITH_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync => sync(&cli).await,
        Commands::Releases => releases(&cli),
        Commands::Build {
            ref release,
            ref request,
            no_wait,
        } => build(&cli, release, request, no_wait).await,
        Commands::Job {
            ref release,
            ref short_id,
        } => job(&cli, release, short_id).await,
        Commands::Jobs { ref release } => jobs(&cli, release).await,
    }
}

async fn sync(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let syncer = ReleaseSync::new(&cli.root, config.install_command, config.info_command);
    syncer.sync(&config.releases).await?;
    tracing::info!(releases = config.releases.len(), "sync complete");
    Ok(())
}

fn releases(cli: &Cli) -> Result<()> {
    let mut releases = Release::all(&cli.root)?;
    releases.sort_by(|a, b| b.updated.cmp(&a.updated));
    println!("{}", serde_json::to_string_pretty(&releases)?);
    Ok(())
}

fn make_service(cli: &Cli, release: &str, config: &Config) -> Result<JobService> {
    let (program, args) = config
        .build_command
        .split_first()
        .context("build_command must not be empty")?;
    let runner = ProcessBuildRunner::new(program, args.to_vec())
        .with_work_dir(cli.root.join(release));

    Ok(JobService::new(
        Arc::new(FsIndexStore::new(&cli.root)?),
        Arc::new(FsCatalogSource::new(&cli.root)),
        Arc::new(FsArtifactStore::new(&cli.root)?),
        Arc::new(runner),
    ))
}

async fn build(cli: &Cli, release: &str, request_path: &PathBuf, no_wait: bool) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let service = make_service(cli, release, &config)?;

    let data = std::fs::read(request_path)
        .with_context(|| format!("failed to read request {}", request_path.display()))?;
    let request: BuildRequest = serde_json::from_slice(&data)?;

    let record = service.get_or_create_job(release, &request).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    if record.status == JobStatus::Pending && !no_wait {
        let final_record = wait_for_terminal(cli, release, &record.id).await?;
        println!("{}", serde_json::to_string_pretty(&final_record)?);
    }
    Ok(())
}

async fn wait_for_terminal(cli: &Cli, release: &str, id: &ShortId) -> Result<JobRecord> {
    let index = FsIndexStore::new(&cli.root)?;
    loop {
        let snapshot = index.read(release).await?;
        if let Some(record) = snapshot.jobs.get(id) {
            if record.status != JobStatus::Pending {
                return Ok(record.clone());
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn job(cli: &Cli, release: &str, short_id: &str) -> Result<()> {
    let index = FsIndexStore::new(&cli.root)?;
    let snapshot = index.read(release).await?;
    match snapshot.jobs.get(&ShortId(short_id.to_string())) {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(record)?);
            Ok(())
        }
        None => bail!("job not found: {short_id}"),
    }
}

async fn jobs(cli: &Cli, release: &str) -> Result<()> {
    let index = FsIndexStore::new(&cli.root)?;
    let snapshot = index.read(release).await?;
    let mut records: Vec<_> = snapshot.jobs.values().collect();
    records.sort_by(|a, b| b.updated.cmp(&a.updated));
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
