use crate::domain::metric::{Metric, MetricType, MetricValue};
use crate::domain::ports::MetricRepository;
use crate::services::metric_calculation::{
    self, calculate_basic, Comparison, DEFAULT_EMA_ALPHA,
};
use crate::utils::error::Result;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTrend {
    pub sma: Vec<f64>,
    pub ema: Vec<f64>,
}

/// 指標相關的使用案例：計算並保存、比較、趨勢
pub struct MetricService {
    repository: Arc<dyn MetricRepository>,
}

impl MetricService {
    pub fn new(repository: Arc<dyn MetricRepository>) -> Self {
        Self { repository }
    }

    pub async fn calculate_metric(
        &self,
        widget_id: Option<String>,
        metric_name: &str,
        values: &[f64],
        metric_type: MetricType,
    ) -> Result<Metric> {
        let value = calculate_basic(values, metric_type);
        let metric = Metric::new(
            widget_id,
            metric_name,
            MetricValue::new(value)?,
            metric_type,
            Utc::now(),
        )?;

        let saved = self.repository.create(metric).await?;
        tracing::info!(
            "📊 Calculated {} {} = {}",
            saved.metric_type,
            saved.metric_name,
            saved.metric_value
        );
        Ok(saved)
    }

    pub fn compare_metrics(&self, left: f64, right: f64) -> Comparison {
        metric_calculation::compare(left, right)
    }

    pub fn metric_trend(&self, values: &[f64], window: i64) -> MetricTrend {
        MetricTrend {
            sma: metric_calculation::moving_average(values, window),
            ema: metric_calculation::exponential_moving_average(values, DEFAULT_EMA_ALPHA),
        }
    }
}
