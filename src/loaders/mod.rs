// Loaders: write a transformed Table to its destinations.

pub mod cache;
pub mod warehouse;

use crate::domain::model::Table;
use crate::utils::error::Result;
use async_trait::async_trait;

pub use cache::CacheLoader;
pub use warehouse::WarehouseLoader;

#[async_trait]
pub trait Loader: Send + Sync {
    /// 寫入目的地，回傳寫入筆數
    async fn load(&self, table: &Table, destination: &str) -> Result<usize>;
}
