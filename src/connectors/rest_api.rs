use crate::connectors::Connector;
use crate::domain::model::ExtractConfig;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// REST API 來源，GET 失敗時以線性退避重試
#[derive(Debug, Clone)]
pub struct RestApiConnector {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl RestApiConnector {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            client: Client::new(),
            timeout,
            max_retries: max_retries.max(1),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// 每次重試等待 `backoff × 第幾次嘗試`
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<Value> {
        let mut request = self.client.get(endpoint).timeout(self.timeout);

        if !params.is_empty() {
            request = request.query(params);
        }
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

impl Default for RestApiConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_MAX_RETRIES)
    }
}

#[async_trait]
impl Connector for RestApiConnector {
    async fn test_connection(&self, config: &ExtractConfig) -> bool {
        let Some(endpoint) = config.get_str("endpoint") else {
            return false;
        };

        match self.client.get(endpoint).timeout(self.timeout).send().await {
            Ok(response) => response.status().as_u16() < 500,
            Err(e) => {
                tracing::debug!("API connection test failed for {}: {}", endpoint, e);
                false
            }
        }
    }

    async fn fetch(&self, config: &ExtractConfig) -> Result<Value> {
        let endpoint = config.require_str("endpoint")?;
        let params = config.get_string_map("params")?;
        let headers = config.get_string_map("headers")?;

        let mut attempt = 0;
        loop {
            match self.get_json(endpoint, &params, &headers).await {
                Ok(payload) => {
                    if attempt > 0 {
                        tracing::info!("📡 {} succeeded after {} retries", endpoint, attempt);
                    }
                    return Ok(payload);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_retries {
                        tracing::error!(
                            "❌ API request to {} failed after {} attempts: {}",
                            endpoint,
                            attempt,
                            e
                        );
                        return Err(e);
                    }
                    let delay = self.backoff * attempt;
                    tracing::warn!(
                        "⚠️ API request to {} failed (attempt {}/{}): {}; retrying in {:?}",
                        endpoint,
                        attempt,
                        self.max_retries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
