use crate::connectors::rest_api::{RestApiConnector, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use crate::domain::metric::Widget;
use crate::domain::model::ExtractConfig;
use crate::extractors::ExtractorRegistry;
use crate::loaders::cache::DEFAULT_CACHE_TTL;
use crate::transformers::{Aggregator, EtlTransformer};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_table_name, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_WAREHOUSE_PATH: &str = "kpi_warehouse.db";

/// TOML 管線設定檔
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub pipeline: PipelineSection,
    pub source: SourceSection,
    #[serde(default)]
    pub transform: TransformSection,
    pub http: Option<HttpSection>,
    pub warehouse: Option<WarehouseSection>,
    pub cache: Option<CacheSection>,
    pub monitoring: Option<MonitoringSection>,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    pub r#type: String,
    pub destination_table: String,
    pub data_source_id: Option<String>,
    #[serde(default)]
    pub config: ExtractConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformSection {
    #[serde(default)]
    pub group_by: Vec<String>,
    /// 欄位名稱 → 彙總函式，依設定檔順序
    #[serde(default)]
    pub aggregations: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSection {
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseSection {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
}

fn env_var_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| EtlError::config(format!("invalid env var pattern: {}", e)))?;
    Ok(PATTERN.get_or_init(|| re))
}

impl PipelineSettings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        toml::from_str(&processed)
            .map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

    /// 替換 `${VAR}`；未設定的變數保留原文
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = env_var_pattern()?;
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });
        Ok(result.into_owned())
    }

    pub fn extract_config(&self) -> &ExtractConfig {
        &self.source.config
    }

    pub fn aggregator(&self) -> Result<Option<Aggregator>> {
        let transform = &self.transform;
        if transform.group_by.is_empty() || transform.aggregations.is_empty() {
            return Ok(None);
        }

        let mut pairs = Vec::with_capacity(transform.aggregations.len());
        for (column, function) in &transform.aggregations {
            let function = function.as_str().ok_or_else(|| EtlError::InvalidConfigValueError {
                field: format!("transform.aggregations.{}", column),
                value: function.to_string(),
                reason: "aggregation function must be a string".to_string(),
            })?;
            pairs.push((column.clone(), function.to_string()));
        }
        Ok(Some(Aggregator::new(transform.group_by.clone(), pairs)?))
    }

    pub fn transformer(&self) -> Result<EtlTransformer> {
        Ok(EtlTransformer::new(self.aggregator()?))
    }

    pub fn rest_connector(&self) -> RestApiConnector {
        let timeout = self
            .http
            .as_ref()
            .and_then(|h| h.timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let max_retries = self
            .http
            .as_ref()
            .and_then(|h| h.max_retries)
            .unwrap_or(DEFAULT_MAX_RETRIES);
        RestApiConnector::new(timeout, max_retries)
    }

    pub fn warehouse_path(&self) -> &str {
        self.warehouse
            .as_ref()
            .map(|w| w.path.as_str())
            .unwrap_or(DEFAULT_WAREHOUSE_PATH)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache
            .as_ref()
            .and_then(|c| c.ttl_seconds)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for PipelineSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        if !ExtractorRegistry::supports(&self.source.r#type) {
            return Err(EtlError::UnsupportedSourceType {
                source_type: self.source.r#type.clone(),
            });
        }
        validate_table_name("source.destination_table", &self.source.destination_table)?;

        if self.source.r#type == "api" {
            let endpoint = self.source.config.require_str("endpoint")?;
            validate_url("source.config.endpoint", endpoint)?;
        }

        if let Some(http) = &self.http {
            if let Some(timeout) = http.timeout_seconds {
                validate_range("http.timeout_seconds", timeout, 1, 600)?;
            }
            if let Some(retries) = http.max_retries {
                validate_range("http.max_retries", retries, 1, 10)?;
            }
        }

        validate_path("warehouse.path", self.warehouse_path())?;

        if let Some(ttl) = self.cache.as_ref().and_then(|c| c.ttl_seconds) {
            validate_range("cache.ttl_seconds", ttl, 1, 86_400)?;
        }

        // 彙總函式名稱在這裡就檢查，不等到執行時
        self.aggregator()?;

        for widget in &self.widgets {
            validate_non_empty_string("widgets.id", &widget.id)?;
        }

        Ok(())
    }
}
