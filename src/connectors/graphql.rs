use crate::connectors::rest_api::DEFAULT_TIMEOUT;
use crate::connectors::Connector;
use crate::domain::model::ExtractConfig;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

const INTROSPECTION_QUERY: &str = "query { __typename }";

#[derive(Debug, Clone)]
pub struct GraphQlConnector {
    client: Client,
    timeout: Duration,
}

impl GraphQlConnector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

impl Default for GraphQlConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for GraphQlConnector {
    async fn test_connection(&self, config: &ExtractConfig) -> bool {
        let Some(endpoint) = config.get_str("endpoint") else {
            return false;
        };

        let result = self
            .client
            .post(endpoint)
            .json(&json!({ "query": INTROSPECTION_QUERY }))
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) => response.status().as_u16() < 500,
            Err(e) => {
                tracing::debug!("GraphQL connection test failed for {}: {}", endpoint, e);
                false
            }
        }
    }

    async fn fetch(&self, config: &ExtractConfig) -> Result<Value> {
        let endpoint = config.require_str("endpoint")?;
        let query = config.require_str("query")?;
        let variables = config.get_object("variables")?;
        let headers = config.get_string_map("headers")?;

        let mut request = self
            .client
            .post(endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .timeout(self.timeout);
        for (key, value) in &headers {
            request = request.header(key, value);
        }

        let response = request.send().await?.error_for_status()?;
        let mut body: Map<String, Value> = response.json().await?;

        // 回應中只要出現頂層 errors 就視為失敗
        if let Some(errors) = body.get("errors") {
            return Err(EtlError::GraphQlError {
                errors: errors.to_string(),
            });
        }

        Ok(match body.remove("data") {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(data) => data,
        })
    }
}
