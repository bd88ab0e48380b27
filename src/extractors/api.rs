use crate::connectors::{Connector, RestApiConnector};
use crate::domain::model::{ExtractConfig, Table};
use crate::extractors::Extractor;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub struct ApiExtractor {
    connector: RestApiConnector,
}

impl ApiExtractor {
    pub fn new(connector: RestApiConnector) -> Self {
        Self { connector }
    }
}

/// API 回應轉為資料列：
/// - 物件且 `data` 為陣列：陣列中每個元素一列
/// - 物件但 `data` 不是陣列（或不存在）：整個物件一列
/// - 其他情況視為資料列陣列
fn payload_rows(payload: Value) -> Vec<Value> {
    match payload {
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            Some(data) => {
                obj.insert("data".to_string(), data);
                vec![Value::Object(obj)]
            }
            None => vec![Value::Object(obj)],
        },
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[async_trait]
impl Extractor for ApiExtractor {
    async fn extract(&self, config: &ExtractConfig) -> Result<Table> {
        let payload = self.connector.fetch(config).await?;
        let rows = payload_rows(payload);
        tracing::debug!("📡 API payload produced {} rows", rows.len());
        Table::from_json_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_payload_rows_shapes() {
        assert_eq!(
            payload_rows(json!({"data": [{"a": 1}, {"a": 2}], "page": 1})),
            vec![json!({"a": 1}), json!({"a": 2})]
        );
        assert_eq!(
            payload_rows(json!({"data": {"a": 1}, "page": 1})),
            vec![json!({"data": {"a": 1}, "page": 1})]
        );
        assert_eq!(payload_rows(json!({"total": 5})), vec![json!({"total": 5})]);
        assert_eq!(payload_rows(json!([{"a": 1}])), vec![json!({"a": 1})]);
    }

    #[tokio::test]
    async fn test_extract_from_wrapped_payload() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/metrics");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"data": [
                    {"day": "2024-01-01", "visits": 10},
                    {"day": "2024-01-02", "visits": 12}
                ]}));
        });

        let config = ExtractConfig::new().with("endpoint", json!(server.url("/metrics")));
        let table = ApiExtractor::new(RestApiConnector::default())
            .extract(&config)
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(table.columns(), &["day", "visits"]);
        assert_eq!(table.len(), 2);
    }
}
