use crate::domain::metric::{Metric, MetricValue, Widget};
use crate::domain::model::{ExtractConfig, Table};
use crate::domain::ports::{Cache, MetricRepository, Warehouse, WidgetRepository};
use crate::extractors::{ExtractorRegistry, SourceType};
use crate::loaders::{CacheLoader, Loader, WarehouseLoader};
use crate::services::metric_calculation::calculate_basic;
use crate::transformers::{EtlTransformer, Transformer};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const STATUS_COMPLETED: &str = "completed";

pub fn cache_key(destination: &str) -> String {
    format!("etl:{}:latest", destination)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub rows_extracted: usize,
    pub rows_loaded: usize,
    pub metrics_generated: usize,
    pub destination: String,
    pub status: String,
}

/// 單次 ETL 執行：抽取 → 轉換 → 寫入倉儲 → 寫入快取 → （可選）產生 widget 指標
///
/// 各階段依序執行，任一階段失敗即中止，不在這裡重試。快取寫入與指標產生
/// 失敗只記錄警告，不影響已寫入倉儲的結果。
pub struct EtlPipeline {
    registry: ExtractorRegistry,
    transformer: EtlTransformer,
    warehouse_loader: WarehouseLoader,
    cache_loader: CacheLoader,
    widgets: Arc<dyn WidgetRepository>,
    metrics: Arc<dyn MetricRepository>,
    monitor: SystemMonitor,
}

impl EtlPipeline {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        cache: Arc<dyn Cache>,
        widgets: Arc<dyn WidgetRepository>,
        metrics: Arc<dyn MetricRepository>,
    ) -> Self {
        Self {
            registry: ExtractorRegistry::default(),
            transformer: EtlTransformer::default(),
            warehouse_loader: WarehouseLoader::new(warehouse),
            cache_loader: CacheLoader::new(cache),
            widgets,
            metrics,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_transformer(mut self, transformer: EtlTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_loader = self.cache_loader.with_ttl(ttl);
        self
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub async fn run(
        &self,
        source_type: &str,
        extract_config: &ExtractConfig,
        destination: &str,
        data_source_id: Option<&str>,
    ) -> Result<PipelineSummary> {
        // 不支援的來源類型在任何 I/O 之前就失敗
        let source_type: SourceType = source_type.parse()?;

        tracing::info!("📡 Extracting from {} source", source_type);
        let raw = self.registry.get(source_type).extract(extract_config).await?;
        tracing::info!("✅ Extracted {} rows", raw.len());
        self.monitor.log_stage("Extract", raw.len());

        let transformed = self.transformer.transform(&raw)?;
        tracing::info!(
            "🔄 Transformed into {} rows x {} columns",
            transformed.len(),
            transformed.columns().len()
        );
        self.monitor.log_stage("Transform", transformed.len());

        let rows_loaded = self.warehouse_loader.load(&transformed, destination).await?;
        tracing::info!("💾 Loaded {} rows into {}", rows_loaded, destination);

        let key = cache_key(destination);
        if let Err(e) = self.cache_loader.load(&transformed, &key).await {
            tracing::warn!("⚠️ Cache write for {} failed: {}", key, e);
        }
        self.monitor.log_stage("Load", rows_loaded);

        let metrics_generated = match data_source_id {
            Some(id) => match self.materialize_metrics(&transformed, id).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("⚠️ Metric generation for data source {} failed: {}", id, e);
                    0
                }
            },
            None => 0,
        };
        if metrics_generated > 0 {
            tracing::info!("📊 Generated {} widget metrics", metrics_generated);
        }
        self.monitor.log_final_stats();

        Ok(PipelineSummary {
            rows_extracted: raw.len(),
            rows_loaded,
            metrics_generated,
            destination: destination.to_string(),
            status: STATUS_COMPLETED.to_string(),
        })
    }

    async fn materialize_metrics(&self, table: &Table, data_source_id: &str) -> Result<usize> {
        if table.is_empty() {
            return Ok(0);
        }
        let numeric_columns = table.numeric_columns();
        if numeric_columns.is_empty() {
            return Ok(0);
        }

        let widgets = self.widgets.list_by_data_source(data_source_id).await?;
        if widgets.is_empty() {
            return Ok(0);
        }

        let timestamp = Utc::now();
        let mut dimensions = Map::new();
        dimensions.insert(
            "data_source_id".to_string(),
            Value::String(data_source_id.to_string()),
        );

        let metrics: Vec<Metric> = widgets
            .iter()
            .filter_map(|widget| {
                widget_metric(table, &numeric_columns, widget, timestamp, &dimensions)
            })
            .collect();
        if metrics.is_empty() {
            return Ok(0);
        }

        self.metrics.create_many(metrics).await
    }
}

/// 設定的 metric 欄位存在就用它，否則取第一個數值欄位
fn resolve_column<'a>(
    table: &'a Table,
    numeric_columns: &'a [String],
    metric: Option<&'a str>,
) -> Option<&'a str> {
    match metric {
        Some(name) if table.has_column(name) => Some(name),
        _ => numeric_columns.first().map(String::as_str),
    }
}

fn widget_metric(
    table: &Table,
    numeric_columns: &[String],
    widget: &Widget,
    timestamp: DateTime<Utc>,
    dimensions: &Map<String, Value>,
) -> Option<Metric> {
    let config = widget.metric_config();

    let Some(column) = resolve_column(table, numeric_columns, config.metric.as_deref()) else {
        tracing::debug!("Widget {} has no usable column, skipping", widget.id);
        return None;
    };

    let series = table.numeric_series(column);
    if series.is_empty() {
        tracing::debug!("Column {} has no numeric values for widget {}", column, widget.id);
        return None;
    }

    let metric_type = config.metric_type();
    let value = calculate_basic(&series, metric_type);
    let metric_name = config.metric.as_deref().unwrap_or(column);

    let metric = MetricValue::new(value).and_then(|value| {
        Metric::new(
            Some(widget.id.clone()),
            metric_name,
            value,
            metric_type,
            timestamp,
        )
    });
    match metric {
        Ok(metric) => Some(metric.with_dimensions(dimensions.clone())),
        Err(e) => {
            tracing::warn!("⚠️ Skipping widget {}: {}", widget.id, e);
            None
        }
    }
}
