use anyhow::Context;
use clap::Parser;
use kpi_etl::adapters::{InMemoryMetricRepository, InMemoryWidgetRepository, MemoryCache, SqliteWarehouse};
use kpi_etl::core::jobs::{EtlJob, JobQueue, JobStats, LocalJobQueue, RetryPolicy};
use kpi_etl::utils::logger;
use kpi_etl::EtlPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "kpi-worker")]
#[command(about = "Runs queued ETL jobs (one JSON object per line) with bounded retry")]
struct Args {
    /// JSON lines file of jobs
    #[arg(short, long)]
    jobs: PathBuf,

    #[arg(long, default_value = "kpi_warehouse.db")]
    warehouse: String,

    #[arg(long, default_value = "3")]
    max_retries: u32,

    #[arg(long, default_value = "64")]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_worker_logger();

    let warehouse = SqliteWarehouse::open(&args.warehouse)
        .with_context(|| format!("failed to open warehouse '{}'", args.warehouse))?;
    let pipeline = Arc::new(EtlPipeline::new(
        Arc::new(warehouse),
        Arc::new(MemoryCache::new()),
        Arc::new(InMemoryWidgetRepository::default()),
        Arc::new(InMemoryMetricRepository::new()),
    ));

    let stats = Arc::new(JobStats::new());
    let policy = RetryPolicy {
        max_retries: args.max_retries,
        ..RetryPolicy::default()
    };
    let (queue, worker) = LocalJobQueue::start(pipeline, policy, stats.clone(), args.queue_capacity);

    let file = tokio::fs::File::open(&args.jobs)
        .await
        .with_context(|| format!("failed to open jobs file '{}'", args.jobs.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EtlJob>(&line) {
            Ok(job) => {
                queue.enqueue(job).await?;
            }
            Err(e) => tracing::warn!("⚠️ Skipping invalid job on line {}: {}", line_no, e),
        }
    }

    drop(queue);
    worker.await.context("job worker panicked")?;

    let total = stats.total();
    tracing::info!(success = total.success, failed = total.failed, "✅ All jobs processed");
    Ok(())
}
