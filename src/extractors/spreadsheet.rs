use crate::domain::model::{ExtractConfig, Table};
use crate::extractors::Extractor;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// 試算表來源的替代實作：沒有串接線上試算表時，直接讀取 `config.rows`
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for SpreadsheetExtractor {
    async fn extract(&self, config: &ExtractConfig) -> Result<Table> {
        match config.get("rows") {
            None | Some(Value::Null) => Ok(Table::empty()),
            Some(Value::Array(rows)) => Table::from_json_rows(rows.clone()),
            Some(other) => Err(EtlError::InvalidConfigValueError {
                field: "rows".to_string(),
                value: other.to_string(),
                reason: "rows must be a list".to_string(),
            }),
        }
    }
}
