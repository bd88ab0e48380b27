// Services: metric math and the metric use cases built on it.

pub mod metric_calculation;
pub mod metrics;

pub use metric_calculation::{calculate_basic, compare, growth_rate, Comparison};
pub use metrics::{MetricService, MetricTrend};
