pub mod aggregator;
pub mod export;
pub mod ingestion;
pub mod ledger;
pub mod merge_key;
pub mod reconciler;
pub mod summary;
pub mod unit;

pub use aggregator::consolidate;
pub use ledger::{PendingSync, StockLedger, SyncOutcome};
pub use merge_key::build_key;
pub use reconciler::reconcile;
pub use unit::normalize_unit;
