use crate::connectors::{Connector, SqlConnector};
use crate::domain::model::{ExtractConfig, Table};
use crate::extractors::Extractor;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;

pub struct DatabaseExtractor {
    connector: SqlConnector,
}

impl DatabaseExtractor {
    pub fn new(connector: SqlConnector) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Extractor for DatabaseExtractor {
    async fn extract(&self, config: &ExtractConfig) -> Result<Table> {
        match self.connector.fetch(config).await? {
            Value::Array(rows) => Table::from_json_rows(rows),
            other => Err(EtlError::processing(format!(
                "SQL connector returned a non-array payload: {}",
                other
            ))),
        }
    }
}
