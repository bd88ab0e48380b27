use crate::domain::metric::{Metric, Widget};
use crate::domain::model::Record;
use crate::domain::ports::{Cache, MetricRepository, Warehouse, WidgetRepository};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 記憶體資料倉儲，以資料表名稱分開保存資料列
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    tables: Mutex<HashMap<String, Vec<Record>>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.lock().await;
        tables.get(table).map(Vec::len).unwrap_or(0)
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        let tables = self.tables.lock().await;
        tables.get(table).cloned().unwrap_or_default()
    }

    pub async fn table_names(&self) -> Vec<String> {
        let tables = self.tables.lock().await;
        tables.keys().cloned().collect()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn append(&self, table: &str, _columns: &[String], rows: &[Record]) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        tables
            .entry(table.to_string())
            .or_default()
            .extend_from_slice(rows);
        Ok(rows.len())
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    ttl: Duration,
    expires_at: Instant,
}

/// 具 TTL 的記憶體快取，過期項目在讀取時移除
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ttl_of(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock().await;
        entries.get(key).map(|entry| entry.ttl)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                ttl,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWidgetRepository {
    widgets: Mutex<Vec<Widget>>,
}

impl InMemoryWidgetRepository {
    pub fn new(widgets: Vec<Widget>) -> Self {
        Self {
            widgets: Mutex::new(widgets),
        }
    }

    pub async fn add(&self, widget: Widget) {
        self.widgets.lock().await.push(widget);
    }
}

#[async_trait]
impl WidgetRepository for InMemoryWidgetRepository {
    async fn list_by_data_source(&self, data_source_id: &str) -> Result<Vec<Widget>> {
        let widgets = self.widgets.lock().await;
        Ok(widgets
            .iter()
            .filter(|w| w.data_source_id.as_deref() == Some(data_source_id))
            .cloned()
            .collect())
    }
}

/// 只新增不修改的指標儲存
#[derive(Debug, Default)]
pub struct InMemoryMetricRepository {
    metrics: Mutex<Vec<Metric>>,
}

impl InMemoryMetricRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Metric> {
        self.metrics.lock().await.clone()
    }
}

#[async_trait]
impl MetricRepository for InMemoryMetricRepository {
    async fn create(&self, metric: Metric) -> Result<Metric> {
        self.metrics.lock().await.push(metric.clone());
        Ok(metric)
    }

    async fn create_many(&self, metrics: Vec<Metric>) -> Result<usize> {
        let count = metrics.len();
        self.metrics.lock().await.extend(metrics);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_entries_expire() {
        let cache = MemoryCache::new();
        cache.set("k", json!(1), Duration::from_millis(20)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(1)));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_widget_lookup_by_data_source() {
        let repo = InMemoryWidgetRepository::new(vec![
            Widget {
                id: "w1".to_string(),
                data_source_id: Some("ds-1".to_string()),
                config: Default::default(),
            },
            Widget {
                id: "w2".to_string(),
                data_source_id: Some("ds-2".to_string()),
                config: Default::default(),
            },
            Widget {
                id: "w3".to_string(),
                data_source_id: None,
                config: Default::default(),
            },
        ]);

        let widgets = repo.list_by_data_source("ds-1").await.unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].id, "w1");
    }
}
