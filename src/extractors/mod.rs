// Extractors: turn a source-specific config into a uniform Table.

pub mod api;
pub mod csv;
pub mod database;
pub mod spreadsheet;

use crate::connectors::{RestApiConnector, SqlConnector};
use crate::domain::model::{ExtractConfig, Table};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;

pub use self::api::ApiExtractor;
pub use self::csv::CsvExtractor;
pub use self::database::DatabaseExtractor;
pub use self::spreadsheet::SpreadsheetExtractor;

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, config: &ExtractConfig) -> Result<Table>;
}

/// ETL 支援的資料來源類型；新增來源只需要加一個 variant 與對應的 extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Api,
    Database,
    Csv,
    GoogleSheets,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::Api,
        SourceType::Database,
        SourceType::Csv,
        SourceType::GoogleSheets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Api => "api",
            SourceType::Database => "database",
            SourceType::Csv => "csv",
            SourceType::GoogleSheets => "google_sheets",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        SourceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EtlError::UnsupportedSourceType {
                source_type: s.to_string(),
            })
    }
}

/// 來源類型對應 extractor 的固定註冊表，建立後唯讀
pub struct ExtractorRegistry {
    api: ApiExtractor,
    database: DatabaseExtractor,
    csv: CsvExtractor,
    google_sheets: SpreadsheetExtractor,
}

impl ExtractorRegistry {
    pub fn new(rest: RestApiConnector) -> Self {
        Self {
            api: ApiExtractor::new(rest),
            database: DatabaseExtractor::new(SqlConnector::new()),
            csv: CsvExtractor::new(),
            google_sheets: SpreadsheetExtractor::new(),
        }
    }

    pub fn get(&self, source_type: SourceType) -> &dyn Extractor {
        match source_type {
            SourceType::Api => &self.api,
            SourceType::Database => &self.database,
            SourceType::Csv => &self.csv,
            SourceType::GoogleSheets => &self.google_sheets,
        }
    }

    /// 字串形式的來源類型是否受支援
    pub fn supports(source_type: &str) -> bool {
        source_type.parse::<SourceType>().is_ok()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(RestApiConnector::default())
    }
}
