use crate::domain::model::{ColumnKind, Record, Table};
use crate::transformers::Transformer;
use crate::utils::error::Result;
use serde_json::Value;
use std::collections::HashSet;

/// 清理：補值並移除完全重複的資料列
///
/// 數值欄位的缺值補 `0`，其他欄位補空字串。欄位型別在這裡推斷一次並記錄在表格上，
/// 後續階段直接使用。先補值再去重，確保重複套用結果不變。
#[derive(Debug, Clone, Default)]
pub struct DataCleaner;

impl DataCleaner {
    pub fn new() -> Self {
        Self
    }

    fn fill_value(kind: ColumnKind) -> Value {
        match kind {
            ColumnKind::Numeric => Value::from(0),
            _ => Value::String(String::new()),
        }
    }
}

impl Transformer for DataCleaner {
    fn transform(&self, table: &Table) -> Result<Table> {
        let columns = table.columns().to_vec();
        let kinds: Vec<ColumnKind> = columns
            .iter()
            .map(|c| table.column_kind(c).unwrap_or(ColumnKind::Text))
            .collect();

        let mut cleaned = Table::new(columns.clone());
        for (column, kind) in columns.iter().zip(&kinds) {
            cleaned.set_kind(column, *kind);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut dropped = 0usize;

        for row in table.rows() {
            let mut filled = Record::new();
            for (column, kind) in columns.iter().zip(&kinds) {
                let value = match row.get(column) {
                    None | Some(Value::Null) => Self::fill_value(*kind),
                    Some(value) => value.clone(),
                };
                filled.insert(column.clone(), value);
            }

            // 以欄位順序序列化作為去重鍵
            let key = serde_json::to_string(&cleaned.row_values(&filled))?;
            if seen.insert(key) {
                cleaned.rows_mut().push(filled);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            tracing::debug!("🧹 Dropped {} duplicate rows", dropped);
        }
        Ok(cleaned)
    }
}
