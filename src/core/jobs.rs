use crate::core::pipeline::{EtlPipeline, PipelineSummary};
use crate::domain::model::ExtractConfig;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 排入佇列的一次 ETL 執行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlJob {
    pub source_type: String,
    pub extract_config: ExtractConfig,
    pub destination_table: String,
    #[serde(default)]
    pub data_source_id: Option<String>,
}

/// job 層的重試：第 n 次重試前等待 `base × 2^n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base: Duration) -> Self {
        Self { max_retries, base }
    }

    pub fn countdown(&self, retries: u32) -> Duration {
        self.base * 2u32.saturating_pow(retries)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub success: u64,
    pub failed: u64,
}

/// 各來源類型的 job 成功 / 失敗次數
#[derive(Debug, Default)]
pub struct JobStats {
    counts: Mutex<HashMap<String, JobCounts>>,
}

impl JobStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, source_type: &str, success: bool) {
        if let Ok(mut counts) = self.counts.lock() {
            let entry = counts.entry(source_type.to_string()).or_default();
            if success {
                entry.success += 1;
            } else {
                entry.failed += 1;
            }
        }
    }

    pub fn counts(&self, source_type: &str) -> JobCounts {
        self.counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(source_type).copied())
            .unwrap_or_default()
    }

    pub fn total(&self) -> JobCounts {
        self.counts
            .lock()
            .map(|counts| {
                counts.values().fold(JobCounts::default(), |acc, c| JobCounts {
                    success: acc.success + c.success,
                    failed: acc.failed + c.failed,
                })
            })
            .unwrap_or_default()
    }
}

/// 執行 job；可重試的錯誤依 policy 重試，設定類錯誤直接失敗
pub async fn run_etl_job(
    pipeline: &EtlPipeline,
    job: &EtlJob,
    policy: &RetryPolicy,
    stats: &JobStats,
) -> Result<PipelineSummary> {
    let mut retries = 0;
    loop {
        let result = pipeline
            .run(
                &job.source_type,
                &job.extract_config,
                &job.destination_table,
                job.data_source_id.as_deref(),
            )
            .await;

        match result {
            Ok(summary) => {
                stats.record(&job.source_type, true);
                return Ok(summary);
            }
            Err(e) if e.is_retryable() && retries < policy.max_retries => {
                let delay = policy.countdown(retries);
                retries += 1;
                tracing::warn!(
                    "⚠️ ETL job for {} failed (retry {}/{} in {:?}): {}",
                    job.destination_table,
                    retries,
                    policy.max_retries,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                stats.record(&job.source_type, false);
                tracing::error!(
                    "❌ ETL job for {} failed after {} retries: {}",
                    job.destination_table,
                    retries,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// 排入 job，回傳 job id
    async fn enqueue(&self, job: EtlJob) -> Result<String>;
}

/// 行程內的 job 佇列，由單一背景 worker 依序執行
pub struct LocalJobQueue {
    sender: mpsc::Sender<(String, EtlJob)>,
}

impl LocalJobQueue {
    /// 啟動 worker；所有 `LocalJobQueue` 被 drop 後 worker 處理完剩餘 job 即結束
    pub fn start(
        pipeline: Arc<EtlPipeline>,
        policy: RetryPolicy,
        stats: Arc<JobStats>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<(String, EtlJob)>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some((job_id, job)) = receiver.recv().await {
                tracing::info!("🚀 Running ETL job {} -> {}", job_id, job.destination_table);
                match run_etl_job(&pipeline, &job, &policy, &stats).await {
                    Ok(summary) => tracing::info!(
                        "✅ Job {} loaded {} rows, {} metrics",
                        job_id,
                        summary.rows_loaded,
                        summary.metrics_generated
                    ),
                    Err(e) => tracing::error!("❌ Job {} failed: {}", job_id, e),
                }
            }
            tracing::debug!("Job worker stopped");
        });

        (Self { sender }, worker)
    }
}

#[async_trait]
impl JobQueue for LocalJobQueue {
    async fn enqueue(&self, job: EtlJob) -> Result<String> {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.sender
            .send((job_id.clone(), job))
            .await
            .map_err(|_| EtlError::QueueUnavailable {
                message: "job worker has stopped".to_string(),
            })?;
        Ok(job_id)
    }
}
