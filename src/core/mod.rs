pub mod jobs;
pub mod pipeline;
pub mod sync;

pub use jobs::{run_etl_job, EtlJob, JobQueue, JobStats, LocalJobQueue, RetryPolicy};
pub use pipeline::{EtlPipeline, PipelineSummary};
pub use sync::{sync_data_source, DataSource, SyncOutcome, SyncStatus};
