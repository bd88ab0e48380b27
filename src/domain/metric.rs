use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Raw,
    Sum,
    Avg,
    Count,
    Min,
    Max,
    Percentile,
    GrowthRate,
    Ratio,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Raw => "raw",
            MetricType::Sum => "sum",
            MetricType::Avg => "avg",
            MetricType::Count => "count",
            MetricType::Min => "min",
            MetricType::Max => "max",
            MetricType::Percentile => "percentile",
            MetricType::GrowthRate => "growth_rate",
            MetricType::Ratio => "ratio",
        }
    }

    /// Widget 設定中的 aggregation 名稱（不分大小寫）對應到指標型別，
    /// 無法辨識的名稱一律視為 RAW（取最後一個值）
    pub fn from_aggregation(aggregation: &str) -> Self {
        match aggregation.trim().to_lowercase().as_str() {
            "sum" | "total" => MetricType::Sum,
            "avg" | "average" | "mean" => MetricType::Avg,
            "count" => MetricType::Count,
            "min" => MetricType::Min,
            "max" => MetricType::Max,
            "percentile" => MetricType::Percentile,
            _ => MetricType::Raw,
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(MetricType::Raw),
            "sum" => Ok(MetricType::Sum),
            "avg" => Ok(MetricType::Avg),
            "count" => Ok(MetricType::Count),
            "min" => Ok(MetricType::Min),
            "max" => Ok(MetricType::Max),
            "percentile" => Ok(MetricType::Percentile),
            "growth_rate" => Ok(MetricType::GrowthRate),
            "ratio" => Ok(MetricType::Ratio),
            other => Err(EtlError::validation(format!(
                "Unknown metric type: {}",
                other
            ))),
        }
    }
}

/// 精確十進位的指標值，不接受 NaN 與無限大。
/// 可表示的絕對值上限為 `Decimal::MAX`（約 7.9e28），超出時回傳超出範圍錯誤。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricValue(Decimal);

impl MetricValue {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() {
            return Err(EtlError::validation("Metric value cannot be NaN"));
        }
        if value.is_infinite() {
            return Err(EtlError::validation("Metric value cannot be infinity"));
        }
        if value.abs() >= Decimal::MAX.to_f64().unwrap_or(f64::MAX) {
            return Err(EtlError::validation(format!(
                "Metric value {} is out of range (max magnitude {})",
                value,
                Decimal::MAX
            )));
        }
        // 以最短十進位表示轉換，450.0 存成 450 而不是二進位近似值
        Self::parse(&value.to_string())
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let lowered = trimmed.to_lowercase();
        let unsigned = lowered.trim_start_matches(['+', '-']);
        if unsigned == "nan" || unsigned == "snan" {
            return Err(EtlError::validation("Metric value cannot be NaN"));
        }
        if unsigned == "inf" || unsigned == "infinity" {
            return Err(EtlError::validation("Metric value cannot be infinity"));
        }
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Self)
            .map_err(|e| EtlError::validation(format!("Invalid metric value '{}': {}", raw, e)))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl From<Decimal> for MetricValue {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl TryFrom<f64> for MetricValue {
    type Error = EtlError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for MetricValue {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn metric_name_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$")
        .map_err(|e| EtlError::config(format!("invalid metric name pattern: {}", e)))?;
    Ok(PATTERN.get_or_init(|| re))
}

/// 指標紀錄，建立後不可修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub widget_id: Option<String>,
    pub metric_name: String,
    pub metric_value: MetricValue,
    pub metric_type: MetricType,
    pub timestamp: DateTime<Utc>,
    pub dimensions: Option<Map<String, Value>>,
}

impl Metric {
    pub fn new(
        widget_id: Option<String>,
        metric_name: impl Into<String>,
        metric_value: MetricValue,
        metric_type: MetricType,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let metric_name = metric_name.into();
        if !metric_name_pattern()?.is_match(&metric_name) {
            return Err(EtlError::validation(format!(
                "Invalid metric name: {}",
                metric_name
            )));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            widget_id,
            metric_name,
            metric_value,
            metric_type,
            timestamp,
            dimensions: None,
        })
    }

    pub fn with_dimensions(mut self, dimensions: Map<String, Value>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn value_as_f64(&self) -> f64 {
        self.metric_value.to_f64()
    }
}

/// Dashboard widget；ETL 只讀取 id、綁定的資料來源與 config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub data_source_id: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Widget {
    pub fn metric_config(&self) -> WidgetMetricConfig {
        WidgetMetricConfig::from_config(&self.config)
    }
}

/// Widget config 中與指標相關的部分
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetMetricConfig {
    pub metric: Option<String>,
    pub aggregation: Option<String>,
}

impl WidgetMetricConfig {
    pub fn from_config(config: &Map<String, Value>) -> Self {
        let metric = config
            .get("metric")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let aggregation = config.get("aggregation").and_then(|v| match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        });
        Self {
            metric,
            aggregation,
        }
    }

    pub fn metric_type(&self) -> MetricType {
        MetricType::from_aggregation(self.aggregation.as_deref().unwrap_or("sum"))
    }
}
