use crate::domain::model::{ColumnKind, Record, Table};
use crate::transformers::Transformer;
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Mean,
    Count,
    Min,
    Max,
    Median,
    First,
    Last,
    Nunique,
}

impl FromStr for AggregateFunction {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggregateFunction::Sum),
            "mean" | "avg" | "average" => Ok(AggregateFunction::Mean),
            "count" => Ok(AggregateFunction::Count),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            "median" => Ok(AggregateFunction::Median),
            "first" => Ok(AggregateFunction::First),
            "last" => Ok(AggregateFunction::Last),
            "nunique" => Ok(AggregateFunction::Nunique),
            other => Err(EtlError::InvalidConfigValueError {
                field: "aggregations".to_string(),
                value: other.to_string(),
                reason: "unsupported aggregation function".to_string(),
            }),
        }
    }
}

impl AggregateFunction {
    fn apply(&self, values: &[&Value]) -> Value {
        let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();

        match self {
            AggregateFunction::Count => Value::from(present.len()),
            AggregateFunction::Nunique => {
                let distinct: HashSet<String> = present.iter().map(|v| v.to_string()).collect();
                Value::from(distinct.len())
            }
            AggregateFunction::First => present.first().map(|v| (*v).clone()).unwrap_or(Value::Null),
            AggregateFunction::Last => present.last().map(|v| (*v).clone()).unwrap_or(Value::Null),
            AggregateFunction::Min => extreme(&present, Ordering::Less),
            AggregateFunction::Max => extreme(&present, Ordering::Greater),
            AggregateFunction::Sum => {
                let numbers: Vec<&serde_json::Number> =
                    present.iter().filter_map(|v| v.as_number()).collect();
                let exact = numbers
                    .iter()
                    .try_fold(0i64, |acc, n| n.as_i64().and_then(|v| acc.checked_add(v)));
                match exact {
                    Some(total) => Value::from(total),
                    // 非整數或整數溢位時改用浮點加總
                    None => float_value(numbers.iter().filter_map(|n| n.as_f64()).sum()),
                }
            }
            AggregateFunction::Mean => {
                let numbers = floats(&present);
                if numbers.is_empty() {
                    Value::Null
                } else {
                    float_value(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            AggregateFunction::Median => {
                let mut numbers = floats(&present);
                if numbers.is_empty() {
                    return Value::Null;
                }
                numbers.sort_by(|a, b| a.total_cmp(b));
                let mid = numbers.len() / 2;
                let median = if numbers.len() % 2 == 0 {
                    (numbers[mid - 1] + numbers[mid]) / 2.0
                } else {
                    numbers[mid]
                };
                float_value(median)
            }
        }
    }

    fn output_kind(&self, input: ColumnKind) -> ColumnKind {
        match self {
            AggregateFunction::Min
            | AggregateFunction::Max
            | AggregateFunction::First
            | AggregateFunction::Last => input,
            _ => ColumnKind::Numeric,
        }
    }
}

fn floats(values: &[&Value]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_f64()).collect()
}

fn float_value(number: f64) -> Value {
    serde_json::Number::from_f64(number)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// 數值優先比較；沒有數值時以文字比較
fn extreme(values: &[&Value], wanted: Ordering) -> Value {
    let numeric: Vec<&Value> = values.iter().copied().filter(|v| v.is_number()).collect();
    let candidates = if numeric.is_empty() { values.to_vec() } else { numeric };

    candidates
        .into_iter()
        .reduce(|best, v| if compare_values(v, best) == wanted { v } else { best })
        .cloned()
        .unwrap_or(Value::Null)
}

/// 分組鍵排序：數字依大小、字串依字典序，數字排在字串前，null 排最後
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Array(_) | Value::Object(_) => 3,
            Value::Null => 4,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| compare_values(x, y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// 分組彙總；`group_by` 或 `aggregations` 為空時不做任何處理
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    group_by: Vec<String>,
    aggregations: Vec<(String, AggregateFunction)>,
}

impl Aggregator {
    pub fn new<I>(group_by: Vec<String>, aggregations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let aggregations = aggregations
            .into_iter()
            .map(|(column, function)| Ok((column, function.parse()?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            group_by,
            aggregations,
        })
    }

    pub fn is_active(&self) -> bool {
        !self.group_by.is_empty() && !self.aggregations.is_empty()
    }

    fn check_columns(&self, table: &Table) -> Result<()> {
        let referenced = self
            .group_by
            .iter()
            .chain(self.aggregations.iter().map(|(column, _)| column));
        for column in referenced {
            if !table.has_column(column) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "aggregator".to_string(),
                    value: column.clone(),
                    reason: "column not found in data".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Transformer for Aggregator {
    fn transform(&self, table: &Table) -> Result<Table> {
        if !self.is_active() {
            return Ok(table.clone());
        }
        self.check_columns(table)?;

        // null 也是一個分組，不會被丟棄
        let mut groups: Vec<(Vec<Value>, Vec<&Record>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for row in table.rows() {
            let key: Vec<Value> = self
                .group_by
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            let key_str = serde_json::to_string(&key)?;
            match index.get(&key_str) {
                Some(&position) => groups[position].1.push(row),
                None => {
                    index.insert(key_str, groups.len());
                    groups.push((key, vec![row]));
                }
            }
        }
        groups.sort_by(|a, b| compare_keys(&a.0, &b.0));

        let mut columns = self.group_by.clone();
        for (column, _) in &self.aggregations {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        let mut output = Table::new(columns);
        for column in &self.group_by {
            output.set_kind(column, table.column_kind(column).unwrap_or(ColumnKind::Text));
        }
        for (column, function) in &self.aggregations {
            let input = table.column_kind(column).unwrap_or(ColumnKind::Text);
            output.set_kind(column, function.output_kind(input));
        }

        for (key, rows) in groups {
            let mut record = Record::new();
            for (column, value) in self.group_by.iter().zip(key) {
                record.insert(column.clone(), value);
            }
            for (column, function) in &self.aggregations {
                let values: Vec<&Value> = rows
                    .iter()
                    .map(|row| row.get(column).unwrap_or(&Value::Null))
                    .collect();
                record.insert(column.clone(), function.apply(&values));
            }
            output.rows_mut().push(record);
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales() -> Table {
        Table::from_json_rows(vec![
            json!({"region": "south", "product": "a", "revenue": 10, "price": 1.5}),
            json!({"region": "north", "product": "b", "revenue": 5, "price": 2.5}),
            json!({"region": null, "product": "a", "revenue": 1, "price": 4.0}),
            json!({"region": "south", "product": "b", "revenue": 20, "price": 3.5}),
        ])
        .unwrap()
    }

    fn aggregations(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(c, f)| (c.to_string(), f.to_string()))
            .collect()
    }

    #[test]
    fn test_noop_without_group_by_or_aggregations() {
        let table = sales();

        let no_group = Aggregator::new(vec![], aggregations(&[("revenue", "sum")])).unwrap();
        assert_eq!(no_group.transform(&table).unwrap(), table);

        let no_aggs = Aggregator::new(vec!["region".to_string()], vec![]).unwrap();
        assert_eq!(no_aggs.transform(&table).unwrap(), table);
    }

    #[test]
    fn test_groups_sorted_with_null_group_kept() {
        let aggregator = Aggregator::new(
            vec!["region".to_string()],
            aggregations(&[("revenue", "sum"), ("price", "mean"), ("product", "count")]),
        )
        .unwrap();
        let result = aggregator.transform(&sales()).unwrap();

        assert_eq!(result.columns(), &["region", "revenue", "price", "product"]);
        assert_eq!(result.len(), 3);

        let rows = result.rows();
        assert_eq!(rows[0].get("region"), Some(&json!("north")));
        assert_eq!(rows[1].get("region"), Some(&json!("south")));
        assert_eq!(rows[1].get("revenue"), Some(&json!(30)));
        assert_eq!(rows[1].get("price"), Some(&json!(2.5)));
        assert_eq!(rows[1].get("product"), Some(&json!(2)));
        assert_eq!(rows[2].get("region"), Some(&Value::Null));
        assert_eq!(rows[2].get("revenue"), Some(&json!(1)));
    }

    #[test]
    fn test_other_functions() {
        let aggregator = Aggregator::new(
            vec!["product".to_string()],
            aggregations(&[
                ("revenue", "max"),
                ("price", "median"),
                ("region", "nunique"),
            ]),
        )
        .unwrap();
        let result = aggregator.transform(&sales()).unwrap();
        let a = &result.rows()[0];

        assert_eq!(a.get("product"), Some(&json!("a")));
        assert_eq!(a.get("revenue"), Some(&json!(10)));
        assert_eq!(a.get("price"), Some(&json!(2.75)));
        assert_eq!(a.get("region"), Some(&json!(1)));
    }

    #[test]
    fn test_sum_falls_back_to_float_on_integer_overflow() {
        let table = Table::from_json_rows(vec![
            json!({"g": "a", "v": i64::MAX}),
            json!({"g": "a", "v": 1}),
            json!({"g": "b", "v": 2}),
            json!({"g": "b", "v": 3}),
        ])
        .unwrap();
        let aggregator =
            Aggregator::new(vec!["g".to_string()], aggregations(&[("v", "sum")])).unwrap();

        let result = aggregator.transform(&table).unwrap();
        let overflowed = result.rows()[0].get("v").unwrap();
        assert!(overflowed.is_f64());
        assert_eq!(overflowed.as_f64(), Some(i64::MAX as f64 + 1.0));
        assert_eq!(result.rows()[1].get("v"), Some(&json!(5)));
    }

    #[test]
    fn test_unknown_function_is_rejected() {
        let err = Aggregator::new(vec!["region".to_string()], aggregations(&[("revenue", "mode")]))
            .unwrap_err();
        assert!(matches!(err, EtlError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let aggregator =
            Aggregator::new(vec!["country".to_string()], aggregations(&[("revenue", "sum")]))
                .unwrap();
        assert!(aggregator.transform(&sales()).is_err());
    }
}
