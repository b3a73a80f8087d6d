//! Order lifecycle, position accounting, and cross-source reconciliation.

pub mod order_state;
pub mod position_accounting;
pub mod position_book;
pub mod reconciler;

pub use order_state::ingest_trade;
pub use position_accounting::{apply_transaction, equity, mark, pnl, PositionChange};
pub use position_book::PositionBook;
pub use reconciler::{OrderUpdate, Reconciler, ReconciledOrder};
