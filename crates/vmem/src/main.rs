//! vmem entry point: the ingestion worker and a small operator CLI.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use vmem_domain::entities::{IngestMode, JobSettings, JobStatus};
use vmem_domain::ports::{BillingInterface, JobControllerInterface, VectorMemoryInterface};
use vmem_domain::value_objects::{CollectionId, JobId, TenantId};
use vmem_infrastructure::queue::run_worker_loop;
use vmem_infrastructure::{bootstrap, init_logging, load_config};

#[derive(Parser)]
#[command(name = "vmem", version, about = "Turn videos into searchable memory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion worker (pulls jobs from the queue)
    Worker,
    /// Enqueue a media URL or local file for ingestion
    Enqueue {
        #[arg(long)]
        tenant: i64,
        /// Video URL or local file path
        source: String,
        /// Extraction mode: general, recipe, learn, creator, meeting
        #[arg(long, default_value = "general")]
        mode: String,
        /// Skip the vision track (cheaper, audio-only)
        #[arg(long)]
        no_frames: bool,
        /// Target output language code
        #[arg(long)]
        language: Option<String>,
        /// Collection to add the content to
        #[arg(long)]
        collection: Option<String>,
    },
    /// List recent jobs for a tenant
    Jobs {
        #[arg(long)]
        tenant: i64,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Cancel a job
    Cancel {
        #[arg(long)]
        tenant: i64,
        job_id: String,
    },
    /// Semantic search over stored contents
    Search {
        #[arg(long)]
        tenant: i64,
        query: String,
        #[arg(short, default_value_t = 5)]
        n: usize,
    },
    /// Show a tenant's credit balance
    Balance {
        #[arg(long)]
        tenant: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config().context("could not load configuration")?;
    init_logging(&config.logging);
    let context = bootstrap(config).await.context("bootstrap failed")?;

    match cli.command {
        Command::Worker => {
            let queue = context
                .queue
                .clone()
                .context("worker mode requires a queue (thread_fallback is enabled)")?;

            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown signal received");
                    let _ = shutdown_tx.send(true);
                }
            });

            run_worker_loop(queue, Arc::clone(&context.pipeline), shutdown_rx).await;
        }
        Command::Enqueue {
            tenant,
            source,
            mode,
            no_frames,
            language,
            collection,
        } => {
            let mode = IngestMode::from_str(&mode).map_err(anyhow::Error::msg)?;
            let settings = JobSettings {
                analyze_frames: !no_frames,
                language,
                collection_id: collection.map(CollectionId::new),
                ..JobSettings::default()
            };
            let job_id = context
                .controller
                .enqueue(TenantId::new(tenant), &source, mode, settings)
                .await?;
            println!("{job_id}");
        }
        Command::Jobs {
            tenant,
            status,
            limit,
        } => {
            let status = status
                .map(|s| JobStatus::from_str(&s))
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let jobs = context
                .controller
                .list(TenantId::new(tenant), limit, status)
                .await?;
            for job in jobs {
                println!(
                    "{}  {:<9}  {:>5.1}%  {}",
                    job.id,
                    job.status.as_str(),
                    job.progress,
                    job.title
                );
                if let Some(error) = job.error {
                    println!("    error: {error}");
                }
            }
        }
        Command::Cancel { tenant, job_id } => {
            let job_id = JobId::from_string(&job_id);
            let cancelled = context
                .controller
                .cancel(&job_id, TenantId::new(tenant))
                .await?;
            if cancelled {
                println!("cancelled");
            } else {
                println!("not cancellable (already terminal)");
            }
        }
        Command::Search { tenant, query, n } => {
            let results = context
                .memory
                .search(TenantId::new(tenant), &query, n, None, None)
                .await?;
            for hit in results {
                println!(
                    "{:.3}  {}  {}",
                    hit.similarity,
                    hit.content.id,
                    hit.content.title
                );
            }
        }
        Command::Balance { tenant } => {
            let balance = context.billing.balance(TenantId::new(tenant)).await?;
            println!("{balance}");
        }
    }

    Ok(())
}
