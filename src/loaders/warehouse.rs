use crate::domain::model::Table;
use crate::domain::ports::Warehouse;
use crate::loaders::Loader;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 附加寫入資料倉儲；不覆寫也不 upsert
pub struct WarehouseLoader {
    warehouse: Arc<dyn Warehouse>,
}

impl WarehouseLoader {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }
}

#[async_trait]
impl Loader for WarehouseLoader {
    async fn load(&self, table: &Table, destination: &str) -> Result<usize> {
        let written = self
            .warehouse
            .append(destination, table.columns(), table.rows())
            .await?;
        tracing::debug!("💾 Appended {} rows to {}", written, destination);
        Ok(written)
    }
}
