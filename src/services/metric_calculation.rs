use crate::domain::metric::MetricType;
use serde::Serialize;

pub const DEFAULT_EMA_ALPHA: f64 = 0.3;
pub const DEFAULT_TREND_WINDOW: i64 = 3;

/// 依指標型別彙總數值；空輸入一律回傳 0.0
pub fn calculate_basic(values: &[f64], metric_type: MetricType) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    match metric_type {
        MetricType::Sum => values.iter().sum(),
        MetricType::Avg => values.iter().sum::<f64>() / values.len() as f64,
        MetricType::Count => values.len() as f64,
        MetricType::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        MetricType::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        MetricType::Percentile => percentile(values, 95.0),
        _ => values[values.len() - 1],
    }
}

/// 線性內插百分位數（rank = p/100 × (n − 1)）
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous.abs() * 100.0
}

/// 尾端視窗平均，序列開頭的視窗自然縮短；`window <= 0` 原樣回傳
pub fn moving_average(values: &[f64], window: i64) -> Vec<f64> {
    if window <= 0 {
        return values.to_vec();
    }
    let window = window as usize;

    (0..values.len())
        .map(|index| {
            let start = (index + 1).saturating_sub(window);
            let chunk = &values[start..=index];
            chunk.iter().sum::<f64>() / chunk.len() as f64
        })
        .collect()
}

pub fn exponential_moving_average(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut ema: Vec<f64> = Vec::with_capacity(values.len());
    for &value in values {
        let next = match ema.last() {
            Some(&previous) => alpha * value + (1.0 - alpha) * previous,
            None => value,
        };
        ema.push(next);
    }
    ema
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Comparison {
    pub left: f64,
    pub right: f64,
    pub delta: f64,
    pub delta_percent: f64,
}

pub fn compare(left: f64, right: f64) -> Comparison {
    let delta = left - right;
    let delta_percent = if right == 0.0 {
        0.0
    } else {
        delta / right.abs() * 100.0
    };
    Comparison {
        left,
        right,
        delta,
        delta_percent,
    }
}
