use crate::connectors::Connector;
use crate::domain::model::ExtractConfig;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use serde_json::{Map, Value};

/// 連線字串指向的 SQLite 資料庫
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(String),
}

impl SqliteTarget {
    /// 支援 `sqlite:///path`（SQLAlchemy 寫法）、`sqlite://path`、
    /// `sqlite::memory:`、`:memory:` 以及直接給檔案路徑
    pub fn parse(connection_string: &str) -> Result<Self> {
        let raw = connection_string.trim();
        match raw {
            "" => Err(EtlError::missing("connection_string")),
            ":memory:" | "sqlite::memory:" | "sqlite://" | "sqlite:///:memory:" => {
                Ok(SqliteTarget::Memory)
            }
            _ => {
                if let Some(path) = raw.strip_prefix("sqlite:///") {
                    Ok(SqliteTarget::File(path.to_string()))
                } else if let Some(path) = raw.strip_prefix("sqlite://") {
                    Ok(SqliteTarget::File(path.to_string()))
                } else if let Some(path) = raw.strip_prefix("sqlite:") {
                    Ok(SqliteTarget::File(path.to_string()))
                } else if let Some((scheme, _)) = raw.split_once("://") {
                    Err(EtlError::InvalidConfigValueError {
                        field: "connection_string".to_string(),
                        value: format!("{}://...", scheme),
                        reason: "only sqlite connection strings are supported".to_string(),
                    })
                } else {
                    Ok(SqliteTarget::File(raw.to_string()))
                }
            }
        }
    }

    pub fn open(&self) -> Result<Connection> {
        let conn = match self {
            SqliteTarget::Memory => Connection::open_in_memory()?,
            SqliteTarget::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI,
            )?,
        };
        Ok(conn)
    }
}

pub(crate) fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(int) => SqlValue::Integer(int),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

pub(crate) fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::from(int),
        ValueRef::Real(real) => serde_json::Number::from_f64(real)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
    }
}

/// 執行查詢並把整個結果集載入記憶體，每列為欄位名稱對應值的物件
pub fn query_rows(conn: &Connection, query: &str, params: &Map<String, Value>) -> Result<Vec<Value>> {
    let mut stmt = conn.prepare(query)?;

    // 只綁定語句中出現的具名參數
    let mut bound: Vec<(String, SqlValue)> = Vec::new();
    for (key, value) in params {
        let name = if key.starts_with([':', '@', '$']) {
            key.clone()
        } else {
            format!(":{}", key)
        };
        if stmt.parameter_index(&name)?.is_some() {
            bound.push((name, json_to_sql(value)));
        }
    }
    let named: Vec<(&str, &dyn ToSql)> = bound
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query(named.as_slice())?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut obj = Map::new();
        for (index, column) in columns.iter().enumerate() {
            obj.insert(column.clone(), sql_to_json(row.get_ref(index)?));
        }
        records.push(Value::Object(obj));
    }
    Ok(records)
}

/// SQL 資料庫來源（SQLite）；阻塞操作在 blocking 執行緒上進行
#[derive(Debug, Clone, Default)]
pub struct SqlConnector;

impl SqlConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for SqlConnector {
    async fn test_connection(&self, config: &ExtractConfig) -> bool {
        let Some(connection_string) = config.get_str("connection_string").map(str::to_string)
        else {
            return false;
        };

        let probe = tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = SqliteTarget::parse(&connection_string)?.open()?;
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
        .await;

        match probe {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!("SQL connection test failed: {}", e);
                false
            }
            Err(e) => {
                tracing::debug!("SQL connection test panicked: {}", e);
                false
            }
        }
    }

    async fn fetch(&self, config: &ExtractConfig) -> Result<Value> {
        let connection_string = config.require_str("connection_string")?.to_string();
        let query = config.require_str("query")?.to_string();
        let params = config.get_object("params")?;

        let rows = tokio::task::spawn_blocking(move || -> Result<Vec<Value>> {
            let conn = SqliteTarget::parse(&connection_string)?.open()?;
            query_rows(&conn, &query, &params)
        })
        .await
        .map_err(|e| EtlError::processing(format!("SQL fetch task failed: {}", e)))??;

        tracing::debug!("🗄️ SQL query returned {} rows", rows.len());
        Ok(Value::Array(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn seeded_db(dir: &TempDir) -> String {
        let path = dir.path().join("sales.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE sales (region TEXT, revenue REAL, customers INTEGER);
             INSERT INTO sales VALUES ('north', 100.5, 3);
             INSERT INTO sales VALUES ('south', 200.0, 4);
             INSERT INTO sales VALUES ('north', 50.0, NULL);",
        )
        .unwrap();
        format!("sqlite:///{}", path.display())
    }

    #[test]
    fn test_parse_connection_strings() {
        assert_eq!(SqliteTarget::parse("sqlite::memory:").unwrap(), SqliteTarget::Memory);
        assert_eq!(
            SqliteTarget::parse("sqlite:///data/app.db").unwrap(),
            SqliteTarget::File("data/app.db".to_string())
        );
        assert_eq!(
            SqliteTarget::parse("sqlite:////tmp/app.db").unwrap(),
            SqliteTarget::File("/tmp/app.db".to_string())
        );
        assert_eq!(
            SqliteTarget::parse("warehouse.db").unwrap(),
            SqliteTarget::File("warehouse.db".to_string())
        );
        assert!(SqliteTarget::parse("postgresql://user@host/db").is_err());
    }

    #[tokio::test]
    async fn test_fetch_with_named_params() {
        let dir = TempDir::new().unwrap();
        let config = ExtractConfig::new()
            .with("connection_string", json!(seeded_db(&dir)))
            .with(
                "query",
                json!("SELECT region, revenue, customers FROM sales WHERE region = :region"),
            )
            .with("params", json!({"region": "north"}));

        let rows = SqlConnector::new().fetch(&config).await.unwrap();
        assert_eq!(
            rows,
            json!([
                {"region": "north", "revenue": 100.5, "customers": 3},
                {"region": "north", "revenue": 50.0, "customers": null}
            ])
        );
    }

    #[tokio::test]
    async fn test_fetch_ignores_unused_params() {
        let dir = TempDir::new().unwrap();
        let config = ExtractConfig::new()
            .with("connection_string", json!(seeded_db(&dir)))
            .with("query", json!("SELECT COUNT(*) AS n FROM sales"))
            .with("params", json!({"unused": 1}));

        let rows = SqlConnector::new().fetch(&config).await.unwrap();
        assert_eq!(rows, json!([{"n": 3}]));
    }

    #[tokio::test]
    async fn test_fetch_requires_query() {
        let config = ExtractConfig::new().with("connection_string", json!("sqlite::memory:"));
        let err = SqlConnector::new().fetch(&config).await.unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { ref field } if field == "query"));
    }

    #[tokio::test]
    async fn test_connection_probe() {
        let dir = TempDir::new().unwrap();
        let connector = SqlConnector::new();

        let good = ExtractConfig::new().with("connection_string", json!(seeded_db(&dir)));
        assert!(connector.test_connection(&good).await);

        let missing_file = dir.path().join("missing.db");
        let bad = ExtractConfig::new().with(
            "connection_string",
            json!(format!("sqlite:///{}", missing_file.display())),
        );
        assert!(!connector.test_connection(&bad).await);

        let unsupported = ExtractConfig::new().with("connection_string", json!("mysql://db"));
        assert!(!connector.test_connection(&unsupported).await);
    }
}
