use crate::core::jobs::{EtlJob, JobQueue};
use crate::core::pipeline::EtlPipeline;
use crate::domain::model::ExtractConfig;
use crate::extractors::ExtractorRegistry;
use crate::utils::error::{ErrorCategory, EtlError, Result};
use crate::utils::validation::{validate_existing_file, validate_url};
use serde::{Deserialize, Serialize};

/// 使用者設定的資料來源
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub config: ExtractConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub message: String,
    pub data_source_id: String,
    pub destination_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceCheck {
    pub data_source_id: String,
    pub supported: bool,
    pub status: String,
}

pub fn supports_source_type(source_type: &str) -> bool {
    ExtractorRegistry::supports(source_type)
}

/// 每個資料來源寫入自己的資料表
pub fn destination_table_for(data_source_id: &str) -> String {
    format!("data_source_{}", data_source_id.replace('-', "_"))
}

/// 依來源類型檢查必要的設定鍵
pub fn validate_extract_config(source_type: &str, config: &ExtractConfig) -> Result<()> {
    match source_type {
        "csv" | "file" => {
            let filepath = config.require_str("filepath")?;
            validate_existing_file("filepath", filepath)
        }
        "api" | "rest" | "graphql" => {
            let endpoint = config.require_str("endpoint")?;
            validate_url("endpoint", endpoint)
        }
        "database" | "sql" => {
            config.require_str("connection_string")?;
            config.require_str("query")?;
            Ok(())
        }
        "google_sheets" => match config.get("rows") {
            None | Some(serde_json::Value::Null) => Err(EtlError::missing("rows")),
            Some(serde_json::Value::Array(_)) => Ok(()),
            Some(other) => Err(EtlError::InvalidConfigValueError {
                field: "rows".to_string(),
                value: other.to_string(),
                reason: "rows must be a list".to_string(),
            }),
        },
        other => Err(EtlError::UnsupportedSourceType {
            source_type: other.to_string(),
        }),
    }
}

pub fn check_data_source(data_source: &DataSource) -> Result<DataSourceCheck> {
    validate_extract_config(&data_source.source_type, &data_source.config)?;

    let supported = supports_source_type(&data_source.source_type);
    Ok(DataSourceCheck {
        data_source_id: data_source.id.clone(),
        supported,
        status: if supported { "ok" } else { "unsupported" }.to_string(),
    })
}

/// 排入 ETL job；佇列無法使用時直接在本地執行。
/// 無法抽取的來源類型在排入前就拒絕。
pub async fn sync_data_source(
    data_source: &DataSource,
    queue: &dyn JobQueue,
    pipeline: &EtlPipeline,
) -> Result<SyncOutcome> {
    validate_extract_config(&data_source.source_type, &data_source.config)?;
    if !supports_source_type(&data_source.source_type) {
        return Err(EtlError::UnsupportedSourceType {
            source_type: data_source.source_type.clone(),
        });
    }

    let destination_table = destination_table_for(&data_source.id);
    let job = EtlJob {
        source_type: data_source.source_type.clone(),
        extract_config: data_source.config.clone(),
        destination_table: destination_table.clone(),
        data_source_id: Some(data_source.id.clone()),
    };

    let (status, message) = match queue.enqueue(job).await {
        Ok(job_id) => {
            tracing::info!("📨 Queued sync job {} for {}", job_id, data_source.id);
            (SyncStatus::Pending, "Sync queued".to_string())
        }
        Err(e) => {
            tracing::warn!("⚠️ Job queue unavailable ({}), syncing {} locally", e, data_source.id);
            pipeline
                .run(
                    &data_source.source_type,
                    &data_source.config,
                    &destination_table,
                    Some(&data_source.id),
                )
                .await
                .map_err(|e| match e.category() {
                    ErrorCategory::Configuration
                    | ErrorCategory::NotFound
                    | ErrorCategory::Validation => EtlError::InvalidDataSourceConfig {
                        message: e.to_string(),
                    },
                    _ => e,
                })?;
            (
                SyncStatus::Success,
                "Sync completed locally (queue unavailable)".to_string(),
            )
        }
    };

    Ok(SyncOutcome {
        status,
        message,
        data_source_id: data_source.id.clone(),
        destination_table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryMetricRepository, InMemoryWidgetRepository, MemoryCache, MemoryWarehouse,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    struct OfflineQueue;

    #[async_trait]
    impl JobQueue for OfflineQueue {
        async fn enqueue(&self, _job: EtlJob) -> Result<String> {
            Err(EtlError::QueueUnavailable {
                message: "broker unreachable".to_string(),
            })
        }
    }

    fn pipeline(warehouse: Arc<MemoryWarehouse>) -> EtlPipeline {
        EtlPipeline::new(
            warehouse,
            Arc::new(MemoryCache::new()),
            Arc::new(InMemoryWidgetRepository::default()),
            Arc::new(InMemoryMetricRepository::new()),
        )
    }

    fn sheet_source(rows: serde_json::Value) -> DataSource {
        DataSource {
            id: "ds-42-a".to_string(),
            source_type: "google_sheets".to_string(),
            config: ExtractConfig::new().with("rows", rows),
        }
    }

    #[test]
    fn test_destination_table_naming() {
        assert_eq!(destination_table_for("ab-cd-ef"), "data_source_ab_cd_ef");
    }

    #[test]
    fn test_validate_extract_config_per_type() {
        let empty = ExtractConfig::new();
        assert!(matches!(
            validate_extract_config("csv", &empty),
            Err(EtlError::MissingConfigError { .. })
        ));
        assert!(matches!(
            validate_extract_config("csv", &ExtractConfig::new().with("filepath", json!("/nope.csv"))),
            Err(EtlError::NotFound { .. })
        ));
        assert_err!(validate_extract_config("api", &empty));
        assert!(validate_extract_config(
            "api",
            &ExtractConfig::new().with("endpoint", json!("https://example.com/kpis"))
        )
        .is_ok());
        assert!(validate_extract_config(
            "database",
            &ExtractConfig::new().with("connection_string", json!("sqlite::memory:"))
        )
        .is_err());
        assert!(validate_extract_config("google_sheets", &empty).is_err());
        assert!(validate_extract_config(
            "google_sheets",
            &ExtractConfig::new().with("rows", json!({"a": 1}))
        )
        .is_err());
        assert!(matches!(
            validate_extract_config("ftp", &empty),
            Err(EtlError::UnsupportedSourceType { .. })
        ));
    }

    #[test]
    fn test_check_data_source_reports_support() {
        let check = assert_ok!(check_data_source(&sheet_source(json!([]))));
        assert!(check.supported);
        assert_eq!(check.status, "ok");

        let graphql = DataSource {
            id: "g1".to_string(),
            source_type: "graphql".to_string(),
            config: ExtractConfig::new().with("endpoint", json!("https://example.com/graphql")),
        };
        let check = assert_ok!(check_data_source(&graphql));
        assert!(!check.supported);
        assert_eq!(check.status, "unsupported");
    }

    #[tokio::test]
    async fn test_sync_falls_back_to_local_run() {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let source = sheet_source(json!([{"revenue": 1}, {"revenue": 2}]));

        let outcome = sync_data_source(&source, &OfflineQueue, &pipeline(warehouse.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.status, SyncStatus::Success);
        assert_eq!(outcome.message, "Sync completed locally (queue unavailable)");
        assert_eq!(outcome.destination_table, "data_source_ds_42_a");
        assert_eq!(warehouse.row_count("data_source_ds_42_a").await, 2);
    }

    #[derive(Default)]
    struct RecordingQueue {
        jobs: std::sync::Mutex<Vec<EtlJob>>,
    }

    #[async_trait]
    impl JobQueue for RecordingQueue {
        async fn enqueue(&self, job: EtlJob) -> Result<String> {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.push(job);
            Ok(format!("job-{}", jobs.len()))
        }
    }

    #[tokio::test]
    async fn test_unextractable_source_is_never_queued() {
        let queue = RecordingQueue::default();
        let graphql = DataSource {
            id: "g1".to_string(),
            source_type: "graphql".to_string(),
            config: ExtractConfig::new().with("endpoint", json!("https://example.com/graphql")),
        };

        let err = sync_data_source(&graphql, &queue, &pipeline(Arc::new(MemoryWarehouse::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::UnsupportedSourceType { .. }));
        assert!(queue.jobs.lock().unwrap().is_empty());

        let outcome = sync_data_source(
            &sheet_source(json!([{"revenue": 1}])),
            &queue,
            &pipeline(Arc::new(MemoryWarehouse::new())),
        )
        .await
        .unwrap();
        assert_eq!(outcome.status, SyncStatus::Pending);
        assert_eq!(queue.jobs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_fallback_config_errors_become_invalid_data_source() {
        let source = DataSource {
            id: "pg".to_string(),
            source_type: "database".to_string(),
            config: ExtractConfig::new()
                .with("connection_string", json!("postgres://localhost/crm"))
                .with("query", json!("SELECT 1")),
        };

        let err = sync_data_source(&source, &OfflineQueue, &pipeline(Arc::new(MemoryWarehouse::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::InvalidDataSourceConfig { .. }));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_queueing() {
        let source = sheet_source(json!("not a list"));
        let err = sync_data_source(&source, &OfflineQueue, &pipeline(Arc::new(MemoryWarehouse::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::InvalidConfigValueError { .. }));
    }
}
