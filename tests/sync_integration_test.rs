use kpi_etl::adapters::{
    InMemoryMetricRepository, InMemoryWidgetRepository, MemoryCache, MemoryWarehouse,
    SqliteWarehouse,
};
use kpi_etl::core::jobs::{JobStats, LocalJobQueue, RetryPolicy};
use kpi_etl::core::sync::{sync_data_source, DataSource, SyncStatus};
use kpi_etl::extractors::ExtractorRegistry;
use kpi_etl::utils::validation::Validate;
use kpi_etl::{EtlPipeline, ExtractConfig, PipelineSettings};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_sync_queues_job_and_worker_loads_table() {
    let warehouse = Arc::new(MemoryWarehouse::new());
    let metrics = Arc::new(InMemoryMetricRepository::new());
    let pipeline = Arc::new(EtlPipeline::new(
        warehouse.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(InMemoryWidgetRepository::new(vec![kpi_etl::Widget {
            id: "w1".to_string(),
            data_source_id: Some("sheet-7".to_string()),
            config: json!({"metric": "visits", "aggregation": "avg"})
                .as_object()
                .cloned()
                .unwrap(),
        }])),
        metrics.clone(),
    ));
    let stats = Arc::new(JobStats::new());
    let (queue, worker) = LocalJobQueue::start(
        pipeline.clone(),
        RetryPolicy::new(3, Duration::from_millis(1)),
        stats.clone(),
        4,
    );

    let source = DataSource {
        id: "sheet-7".to_string(),
        source_type: "google_sheets".to_string(),
        config: ExtractConfig::new().with("rows", json!([{"visits": 10}, {"visits": 30}])),
    };

    let outcome = sync_data_source(&source, &queue, &pipeline).await.unwrap();
    assert_eq!(outcome.status, SyncStatus::Pending);
    assert_eq!(outcome.message, "Sync queued");
    assert_eq!(outcome.destination_table, "data_source_sheet_7");

    drop(queue);
    worker.await.unwrap();

    assert_eq!(warehouse.row_count("data_source_sheet_7").await, 2);
    assert_eq!(stats.counts("google_sheets").success, 1);
    let stored = metrics.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].value_as_f64(), 20.0);
}

#[tokio::test]
async fn test_toml_settings_drive_a_full_run() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("traffic.csv");
    std::fs::write(
        &csv_path,
        "channel,visits,signups\nads,100,5\nseo,300,12\nads,50,1\nads,100,5\n",
    )
    .unwrap();
    let warehouse_path = temp_dir.path().join("kpi.db");

    let toml = format!(
        r#"
[pipeline]
name = "traffic"

[source]
type = "csv"
destination_table = "traffic_by_channel"
data_source_id = "traffic"

[source.config]
filepath = "{}"

[transform]
group_by = ["channel"]
aggregations = {{ visits = "sum", signups = "max" }}

[warehouse]
path = "{}"

[[widgets]]
id = "total-visits"
data_source_id = "traffic"
config = {{ metric = "visits", aggregation = "total" }}
"#,
        csv_path.display(),
        warehouse_path.display()
    );
    let mut config_file = tempfile::NamedTempFile::new_in(temp_dir.path()).unwrap();
    config_file.write_all(toml.as_bytes()).unwrap();

    let settings = PipelineSettings::from_file(config_file.path()).unwrap();
    settings.validate().unwrap();

    let warehouse = Arc::new(SqliteWarehouse::open(settings.warehouse_path()).unwrap());
    let metrics = Arc::new(InMemoryMetricRepository::new());
    let pipeline = EtlPipeline::new(
        warehouse.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(InMemoryWidgetRepository::new(settings.widgets.clone())),
        metrics.clone(),
    )
    .with_registry(ExtractorRegistry::new(settings.rest_connector()))
    .with_transformer(settings.transformer().unwrap())
    .with_cache_ttl(settings.cache_ttl());

    let summary = pipeline
        .run(
            &settings.source.r#type,
            settings.extract_config(),
            &settings.source.destination_table,
            settings.source.data_source_id.as_deref(),
        )
        .await
        .unwrap();

    // 重複的 ads 資料列在清理時移除
    assert_eq!(summary.rows_extracted, 4);
    assert_eq!(summary.rows_loaded, 2);
    assert_eq!(warehouse.count_rows("traffic_by_channel").await.unwrap(), 2);

    let rows = warehouse
        .query("SELECT channel, visits, signups FROM traffic_by_channel ORDER BY channel")
        .await
        .unwrap();
    assert_eq!(
        rows,
        vec![
            json!({"channel": "ads", "visits": 150, "signups": 5}),
            json!({"channel": "seo", "visits": 300, "signups": 12}),
        ]
    );

    assert_eq!(summary.metrics_generated, 1);
    assert_eq!(metrics.all().await[0].value_as_f64(), 450.0);
}
