use crate::domain::model::{ColumnKind, Table};
use crate::transformers::Transformer;
use crate::utils::error::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// 解析日期欄位，無法解析時回傳 None
pub fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// 衍生欄位：
/// - 同時有 `revenue` 與 `customers` 時加上 `avg_ticket = revenue / customers`，
///   `customers` 為 0 時以 1 代替
/// - 有 `date` 時轉為日期時間，並加上 `year`、`month`
#[derive(Debug, Clone, Default)]
pub struct DataEnricher;

impl DataEnricher {
    pub fn new() -> Self {
        Self
    }

    fn add_avg_ticket(table: &mut Table) {
        table.ensure_column("avg_ticket");
        table.set_kind("avg_ticket", ColumnKind::Numeric);

        for row in table.rows_mut() {
            let revenue = row.get("revenue").and_then(Value::as_f64);
            let customers = row.get("customers").and_then(Value::as_f64);
            let avg_ticket = match (revenue, customers) {
                (Some(revenue), Some(customers)) => {
                    // 0 位客戶以 1 計算，輸出與既有報表保持一致
                    let divisor = if customers == 0.0 { 1.0 } else { customers };
                    serde_json::Number::from_f64(revenue / divisor)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
                _ => Value::Null,
            };
            row.insert("avg_ticket", avg_ticket);
        }
    }

    fn expand_date(table: &mut Table) {
        for column in ["year", "month"] {
            table.ensure_column(column);
            table.set_kind(column, ColumnKind::Numeric);
        }
        table.set_kind("date", ColumnKind::Temporal);

        let mut unparsable = 0usize;
        for row in table.rows_mut() {
            let parsed = row.get("date").and_then(parse_date);
            match parsed {
                Some(dt) => {
                    row.insert("date", Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()));
                    row.insert("year", Value::from(dt.year()));
                    row.insert("month", Value::from(dt.month()));
                }
                None => {
                    if !row.is_null("date") {
                        unparsable += 1;
                    }
                    row.insert("date", Value::Null);
                    row.insert("year", Value::Null);
                    row.insert("month", Value::Null);
                }
            }
        }

        if unparsable > 0 {
            tracing::debug!("📅 {} date values could not be parsed", unparsable);
        }
    }
}

impl Transformer for DataEnricher {
    fn transform(&self, table: &Table) -> Result<Table> {
        let mut enriched = table.clone();

        if enriched.has_column("revenue") && enriched.has_column("customers") {
            Self::add_avg_ticket(&mut enriched);
        }
        if enriched.has_column("date") {
            Self::expand_date(&mut enriched);
        }

        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_avg_ticket_treats_zero_customers_as_one() {
        let table = Table::from_json_rows(vec![
            json!({"revenue": 1000, "customers": 50}),
            json!({"revenue": 300, "customers": 0}),
        ])
        .unwrap();
        let enriched = DataEnricher::new().transform(&table).unwrap();

        assert_eq!(enriched.rows()[0].get("avg_ticket"), Some(&json!(20.0)));
        assert_eq!(enriched.rows()[1].get("avg_ticket"), Some(&json!(300.0)));
        assert_eq!(enriched.column_kind("avg_ticket"), Some(ColumnKind::Numeric));
    }

    #[test]
    fn test_avg_ticket_requires_both_columns() {
        let table = Table::from_json_rows(vec![json!({"revenue": 10})]).unwrap();
        let enriched = DataEnricher::new().transform(&table).unwrap();
        assert!(!enriched.has_column("avg_ticket"));
    }

    #[test]
    fn test_date_expansion_nulls_unparsable_values() {
        let table = Table::from_json_rows(vec![
            json!({"date": "2024-01-15"}),
            json!({"date": "2023-12-31T08:30:00Z"}),
            json!({"date": "not a date"}),
        ])
        .unwrap();
        let enriched = DataEnricher::new().transform(&table).unwrap();
        let rows = enriched.rows();

        assert_eq!(rows[0].get("date"), Some(&json!("2024-01-15 00:00:00")));
        assert_eq!(rows[0].get("year"), Some(&json!(2024)));
        assert_eq!(rows[0].get("month"), Some(&json!(1)));
        assert_eq!(rows[1].get("year"), Some(&json!(2023)));
        assert_eq!(rows[1].get("month"), Some(&json!(12)));
        assert_eq!(rows[2].get("date"), Some(&Value::Null));
        assert_eq!(rows[2].get("year"), Some(&Value::Null));
        assert_eq!(enriched.column_kind("date"), Some(ColumnKind::Temporal));
    }

    #[test]
    fn test_does_not_modify_input() {
        let table = Table::from_json_rows(vec![json!({"date": "2024-01-15"})]).unwrap();
        let _ = DataEnricher::new().transform(&table).unwrap();
        assert_eq!(table.columns(), &["date"]);
        assert_eq!(table.rows()[0].get("date"), Some(&json!("2024-01-15")));
    }
}
