use crate::connectors::file::read_csv_table;
use crate::domain::model::{ExtractConfig, Table};
use crate::extractors::Extractor;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct CsvExtractor;

impl CsvExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for CsvExtractor {
    async fn extract(&self, config: &ExtractConfig) -> Result<Table> {
        let path = PathBuf::from(config.require_str("filepath")?);
        tracing::debug!("📄 Reading CSV from {}", path.display());

        tokio::task::spawn_blocking(move || read_csv_table(&path))
            .await
            .map_err(|e| EtlError::processing(format!("CSV read task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn test_extract_reads_headers_from_first_row() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "date,revenue,customers\n2024-01-01,1000,50\n2024-01-02,1500,75\n").unwrap();

        let config = ExtractConfig::new().with("filepath", json!(file.path().to_str().unwrap()));
        let table = CsvExtractor::new().extract(&config).await.unwrap();

        assert_eq!(table.columns(), &["date", "revenue", "customers"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].get("customers"), Some(&json!(75)));
    }

    #[tokio::test]
    async fn test_extract_missing_filepath_key() {
        let err = CsvExtractor::new().extract(&ExtractConfig::new()).await.unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { ref field } if field == "filepath"));
    }

    #[tokio::test]
    async fn test_extract_missing_file() {
        let config = ExtractConfig::new().with("filepath", json!("/no/such/file.csv"));
        let err = CsvExtractor::new().extract(&config).await.unwrap_err();
        assert!(matches!(err, EtlError::NotFound { .. }));
    }
}
