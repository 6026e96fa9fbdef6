//! Live, deterministically ordered projection of a user's history.

mod aggregator;
mod view;

pub use aggregator::{fetch_snapshot, HistoryAggregator};
pub use view::{HistoryRow, HistoryView};
