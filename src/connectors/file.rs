use crate::connectors::Connector;
use crate::domain::model::{parse_cell, ExtractConfig, Record, Table};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Csv,
    Json,
}

fn file_format(path: &Path) -> Result<FileFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("csv") => Ok(FileFormat::Csv),
        Some("json") => Ok(FileFormat::Json),
        _ => Err(EtlError::UnsupportedFileType {
            path: path.display().to_string(),
        }),
    }
}

/// 讀取 CSV 檔案為表格；第一列為欄位名稱，列長度不一致時缺少的欄位為 null
pub fn read_csv_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(EtlError::NotFound {
            kind: "CSV file".to_string(),
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(headers.clone());
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (index, column) in headers.iter().enumerate() {
            let value = row.get(index).map(parse_cell).unwrap_or(Value::Null);
            record.insert(column.clone(), value);
        }
        table.rows_mut().push(record);
    }

    tracing::debug!(
        "📄 Read {} rows x {} columns from {}",
        table.len(),
        headers.len(),
        path.display()
    );
    Ok(table)
}

/// 本機檔案來源
#[derive(Debug, Clone, Default)]
pub struct FileConnector;

impl FileConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for FileConnector {
    async fn test_connection(&self, config: &ExtractConfig) -> bool {
        match config.get_str("filepath") {
            Some(filepath) => Path::new(filepath).exists(),
            None => false,
        }
    }

    async fn fetch(&self, config: &ExtractConfig) -> Result<Value> {
        let filepath = config.require_str("filepath")?;
        let path = Path::new(filepath);

        match file_format(path)? {
            FileFormat::Csv => Ok(Value::Array(read_csv_table(path)?.to_json_rows())),
            FileFormat::Json => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        EtlError::NotFound {
                            kind: "File".to_string(),
                            path: filepath.to_string(),
                        }
                    } else {
                        EtlError::IoError(e)
                    }
                })?;
                Ok(serde_json::from_str(&content)?)
            }
        }
    }
}
