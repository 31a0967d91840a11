pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod external;
pub mod models;
pub mod service;

#[cfg(test)]
mod test_utils;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::{AppError, AppResult, ExtractionError, PersistenceError};
pub use service::{build_key, consolidate, normalize_unit, reconcile, StockLedger};
