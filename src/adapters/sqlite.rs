use crate::connectors::sql::{json_to_sql, query_rows, SqliteTarget};
use crate::domain::model::Record;
use crate::domain::ports::Warehouse;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite 資料倉儲：第一次寫入時建立資料表，之後只做附加寫入
#[derive(Clone)]
pub struct SqliteWarehouse {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// 以連線字串開啟（與 SQL connector 相同格式）
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        match SqliteTarget::parse(connection_string)? {
            SqliteTarget::Memory => Self::in_memory(),
            SqliteTarget::File(path) => Self::open(path),
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| EtlError::processing("warehouse connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| EtlError::processing(format!("warehouse task failed: {}", e)))?
    }

    pub async fn count_rows(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    pub async fn query(&self, sql: &str) -> Result<Vec<Value>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| query_rows(conn, &sql, &Map::new()))
            .await
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn append(&self, table: &str, columns: &[String], rows: &[Record]) -> Result<usize> {
        if table.trim().is_empty() {
            return Err(EtlError::missing("destination_table"));
        }
        if columns.is_empty() {
            return Ok(0);
        }

        let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table),
            quoted.join(", ")
        );
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            quoted.join(", "),
            placeholders
        );

        let values: Vec<Vec<rusqlite::types::Value>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| json_to_sql(row.get(c).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(&create_sql, [])?;
            {
                let mut stmt = tx.prepare(&insert_sql)?;
                for row in &values {
                    stmt.execute(params_from_iter(row.iter()))?;
                }
            }
            tx.commit()?;
            Ok(values.len())
        })
        .await
    }
}
