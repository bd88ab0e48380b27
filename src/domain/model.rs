use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// 單筆資料列，欄位名稱對應到值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    /// 缺少的欄位與 null 視為相同
    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.data.get(column), None | Some(Value::Null))
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.data.insert(column.into(), value);
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(obj: Map<String, Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// 尚未推斷
    Unknown,
    Numeric,
    Text,
    Temporal,
}

/// 各階段之間傳遞的表格資料：欄位順序固定，每列可缺值
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        let kinds = vec![ColumnKind::Unknown; columns.len()];
        Self {
            columns,
            kinds,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// JSON 物件陣列轉為表格，保留物件內的鍵順序
    pub fn from_json_rows(rows: Vec<Value>) -> Result<Self> {
        let mut table = Self::empty();
        for (index, row) in rows.into_iter().enumerate() {
            match row {
                Value::Object(obj) => {
                    for key in obj.keys() {
                        table.ensure_column(key);
                    }
                    table.rows.push(Record::from(obj));
                }
                other => {
                    return Err(EtlError::processing(format!(
                        "Row {} is not an object: {}",
                        index, other
                    )))
                }
            }
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// 新增欄位（已存在則不動），回傳欄位索引
    pub fn ensure_column(&mut self, column: &str) -> usize {
        match self.column_index(column) {
            Some(index) => index,
            None => {
                self.columns.push(column.to_string());
                self.kinds.push(ColumnKind::Unknown);
                self.columns.len() - 1
            }
        }
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Record> {
        &mut self.rows
    }

    pub fn set_kind(&mut self, column: &str, kind: ColumnKind) {
        let index = self.ensure_column(column);
        self.kinds[index] = kind;
    }

    /// 已推斷的欄位型別；尚未推斷時依資料即時判斷
    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        let index = self.column_index(column)?;
        match self.kinds[index] {
            ColumnKind::Unknown => Some(self.observe_kind(column)),
            kind => Some(kind),
        }
    }

    /// 依實際值判斷欄位型別：只要有一個非 null 值不是數字，整欄就是文字
    pub fn observe_kind(&self, column: &str) -> ColumnKind {
        let mut saw_number = false;
        for row in &self.rows {
            match row.get(column) {
                None | Some(Value::Null) => {}
                Some(Value::Number(_)) => saw_number = true,
                Some(_) => return ColumnKind::Text,
            }
        }
        if saw_number {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    /// 數值欄位，依欄位順序
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.column_kind(c) == Some(ColumnKind::Numeric))
            .cloned()
            .collect()
    }

    /// 依欄位順序取出一列的值，缺值補 null
    pub fn row_values(&self, row: &Record) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// 轉為 JSON 物件陣列，欄位依表格順序
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for column in &self.columns {
                    obj.insert(
                        column.clone(),
                        row.get(column).cloned().unwrap_or(Value::Null),
                    );
                }
                Value::Object(obj)
            })
            .collect()
    }

    /// 將欄位值轉為數字，無法轉換的值直接略過
    pub fn numeric_series(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(coerce_f64))
            .collect()
    }
}

/// 數字或可解析為數字的字串轉為 f64；NaN 視為無效
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    if number.is_nan() {
        None
    } else {
        Some(number)
    }
}

/// CSV 儲存格解析：空字串為 null，其次嘗試整數、浮點數，最後為文字
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
        return Value::Null;
    }
    Value::String(raw.to_string())
}

/// 抽取設定：鍵值依資料來源類型而不同
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractConfig(pub Map<String, Value>);

impl ExtractConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(obj) => Ok(Self(obj)),
            other => Err(EtlError::config(format!(
                "Extract config must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 取得非空字串
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key).ok_or_else(|| EtlError::missing(key))
    }

    /// 取得物件型別的設定值，缺少時回傳空物件
    pub fn get_object(&self, key: &str) -> Result<Map<String, Value>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(obj)) => Ok(obj.clone()),
            Some(other) => Err(EtlError::InvalidConfigValueError {
                field: key.to_string(),
                value: other.to_string(),
                reason: "expected an object".to_string(),
            }),
        }
    }

    /// 字串對字串的設定（例如 HTTP headers、query params）
    pub fn get_string_map(&self, key: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .get_object(key)?
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect())
    }
}
