use crate::domain::metric::{Metric, Widget};
use crate::domain::model::Record;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// 資料倉儲：以資料表名稱為鍵的附加寫入
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// 附加寫入，回傳寫入筆數；資料表不存在時由儲存層自行建立
    async fn append(&self, table: &str, columns: &[String], rows: &[Record]) -> Result<usize>;
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<Value>>;
}

#[async_trait]
pub trait WidgetRepository: Send + Sync {
    async fn list_by_data_source(&self, data_source_id: &str) -> Result<Vec<Widget>>;
}

#[async_trait]
pub trait MetricRepository: Send + Sync {
    async fn create(&self, metric: Metric) -> Result<Metric>;
    /// 一次寫入多筆，回傳實際寫入筆數
    async fn create_many(&self, metrics: Vec<Metric>) -> Result<usize>;
}
