pub mod adapters;
pub mod config;
pub mod connectors;
pub mod core;
pub mod domain;
pub mod extractors;
pub mod loaders;
pub mod services;
pub mod transformers;
pub mod utils;

pub use config::PipelineSettings;
pub use core::{EtlPipeline, PipelineSummary};
pub use domain::metric::{Metric, MetricType, MetricValue, Widget};
pub use domain::model::{ExtractConfig, Record, Table};
pub use utils::error::{EtlError, Result};
