// Adapters: concrete implementations of the domain ports.

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryMetricRepository, InMemoryWidgetRepository, MemoryCache, MemoryWarehouse};
pub use sqlite::SqliteWarehouse;
