pub mod document;
pub mod reconciliation;
pub mod stock;

pub use document::{DocType, LineItem, LineItemPatch, SourceDocument};
pub use reconciliation::{ReconciliationReport, ReconciliationRow, ReconciliationStatus};
pub use stock::{
    ConsolidatedStockEntry, GroupBy, Inventory, InventoryGroup, MergeKey, StockSummary,
};
