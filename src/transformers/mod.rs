// Transformers: pure Table -> Table stages composed into one chain.

pub mod aggregator;
pub mod cleaner;
pub mod enricher;

use crate::domain::model::Table;
use crate::utils::error::Result;

pub use aggregator::{AggregateFunction, Aggregator};
pub use cleaner::DataCleaner;
pub use enricher::DataEnricher;

/// 轉換階段：不修改輸入，回傳新的表格
pub trait Transformer: Send + Sync {
    fn transform(&self, table: &Table) -> Result<Table>;
}

/// 固定順序的轉換鏈：清理 → 衍生欄位 → （可選）彙總
///
/// 衍生欄位必須看到已補值的資料，彙總則需要看到衍生出的欄位。
pub struct EtlTransformer {
    cleaner: DataCleaner,
    enricher: DataEnricher,
    aggregator: Option<Aggregator>,
}

impl EtlTransformer {
    pub fn new(aggregator: Option<Aggregator>) -> Self {
        Self {
            cleaner: DataCleaner::new(),
            enricher: DataEnricher::new(),
            aggregator,
        }
    }
}

impl Default for EtlTransformer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transformer for EtlTransformer {
    fn transform(&self, table: &Table) -> Result<Table> {
        let cleaned = self.cleaner.transform(table)?;
        tracing::debug!(
            "🧹 Cleaned {} -> {} rows",
            table.len(),
            cleaned.len()
        );

        let enriched = self.enricher.transform(&cleaned)?;

        match &self.aggregator {
            Some(aggregator) => {
                let aggregated = aggregator.transform(&enriched)?;
                tracing::debug!("📊 Aggregated into {} groups", aggregated.len());
                Ok(aggregated)
            }
            None => Ok(enriched),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_enriches_cleaned_data_before_aggregating() {
        let table = Table::from_json_rows(vec![
            json!({"region": "north", "revenue": 100, "customers": 0}),
            json!({"region": "north", "revenue": null, "customers": 5}),
            json!({"region": "south", "revenue": 300, "customers": 3}),
        ])
        .unwrap();

        let aggregator = Aggregator::new(
            vec!["region".to_string()],
            vec![
                ("revenue".to_string(), "sum".to_string()),
                ("avg_ticket".to_string(), "max".to_string()),
            ],
        )
        .unwrap();
        let result = EtlTransformer::new(Some(aggregator)).transform(&table).unwrap();

        assert_eq!(result.columns(), &["region", "revenue", "avg_ticket"]);
        assert_eq!(result.len(), 2);
        // north: revenue 100 + 0（補值），avg_ticket 取 max(100/1, 0/5)
        assert_eq!(result.rows()[0].get("revenue"), Some(&json!(100)));
        assert_eq!(result.rows()[0].get("avg_ticket"), Some(&json!(100.0)));
        assert_eq!(result.rows()[1].get("revenue"), Some(&json!(300)));
    }

    #[test]
    fn test_chain_without_aggregator_returns_enriched_rows() {
        let table = Table::from_json_rows(vec![json!({"date": "2024-03-05", "value": 1})]).unwrap();
        let result = EtlTransformer::default().transform(&table).unwrap();

        assert_eq!(result.columns(), &["date", "value", "year", "month"]);
        assert_eq!(result.rows()[0].get("year"), Some(&json!(2024)));
        assert_eq!(result.rows()[0].get("month"), Some(&json!(3)));
    }
}
