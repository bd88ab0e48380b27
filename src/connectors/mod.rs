// Connectors: per-source transport (connectivity probe + raw fetch).

pub mod file;
pub mod graphql;
pub mod rest_api;
pub mod sql;

use crate::domain::model::ExtractConfig;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use file::FileConnector;
pub use graphql::GraphQlConnector;
pub use rest_api::RestApiConnector;
pub use sql::SqlConnector;

#[async_trait]
pub trait Connector: Send + Sync {
    /// 連線測試，任何錯誤都回傳 false
    async fn test_connection(&self, config: &ExtractConfig) -> bool;

    /// 取得原始資料
    async fn fetch(&self, config: &ExtractConfig) -> Result<Value>;
}

/// 依連線種類（file / database / api / graphql）取得對應的 connector
pub fn connector_for(kind: &str) -> Option<Box<dyn Connector>> {
    match kind {
        "file" | "csv" => Some(Box::new(FileConnector::new())),
        "database" | "sql" => Some(Box::new(SqlConnector::new())),
        "api" | "rest" => Some(Box::new(RestApiConnector::default())),
        "graphql" => Some(Box::new(GraphQlConnector::default())),
        _ => None,
    }
}
