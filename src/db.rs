pub mod stock_store;
pub use stock_store::{CatalogStore, StockStore, StockTx};
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod memory_store;
pub use memory_store::MemoryStore;
