use crate::domain::model::Table;
use crate::domain::ports::Cache;
use crate::loaders::Loader;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// 將整個結果集以 JSON 陣列存入快取
pub struct CacheLoader {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CacheLoader {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self {
            cache,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[async_trait]
impl Loader for CacheLoader {
    async fn load(&self, table: &Table, destination: &str) -> Result<usize> {
        let rows = table.to_json_rows();
        let count = rows.len();
        self.cache.set(destination, Value::Array(rows), self.ttl).await?;
        tracing::debug!("🗃️ Cached {} rows under {} (ttl {:?})", count, destination, self.ttl);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryCache;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_stores_rows_under_key() {
        let cache = Arc::new(MemoryCache::new());
        let loader = CacheLoader::new(cache.clone());
        let table = Table::from_json_rows(vec![json!({"v": 1})]).unwrap();

        assert_eq!(loader.load(&table, "etl:kpi:latest").await.unwrap(), 1);
        assert_eq!(
            cache.get("etl:kpi:latest").await.unwrap(),
            Some(json!([{"v": 1}]))
        );
        assert_eq!(cache.ttl_of("etl:kpi:latest").await, Some(DEFAULT_CACHE_TTL));
    }
}
