//! # Sales Tally
//!
//! Tracks per-product sales counters scraped from a vendor dashboard.
//! Each scrape is reconciled against the previously stored snapshot to
//! derive how much every product moved since the last scrape and how much
//! it sold today (reset at local midnight).
//!
//! ## Core Concepts
//!
//! - **Snapshot**: the single stored picture of all products and dashboard totals
//! - **Reconciliation**: merging a new scrape into the previous snapshot
//! - **Delta**: change of a product's cumulative counter between two snapshots
//! - **Today's sales**: positive deltas accrued since local midnight
//!
//! ## Example
//!
//! ```ignore
//! use salestally::{Tracker, TrackerConfig, SortKey, SortDirection};
//!
//! let tracker = Tracker::open(TrackerConfig::default())?;
//!
//! // Merge a scrape into the stored snapshot
//! let snapshot = tracker.refresh(&batch)?;
//!
//! // Display view
//! let rows = tracker.sorted(SortKey::TodaysSales, SortDirection::Descending)?;
//!
//! // Append changed products to the spreadsheet
//! tracker.export(&tokens, &sheets)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod observation;
pub mod snapshots;
pub mod sort;
pub mod tracker;
pub mod types;

// Re-exports
pub use config::{SheetTarget, StoreConfig, TrackerConfig};
pub use engine::{diff_stats, reconcile, reconcile_in, ReconcileStats};
pub use error::{Result, TrackerError};
pub use events::{DropReason, EventBus, EventHandle, SubscriptionId, TrackerEvent};
pub use export::{
    export_snapshot, select_for_export, AppendRequest, AppendResponse, ExportOutcome, ExportRow,
    SheetAppender, TokenProvider,
};
pub use observation::{batch_from_scrape, parse_count, ScrapedProduct};
pub use snapshots::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use sort::{sort_products, sort_products_by, SortDirection, SortKey, SortState};
pub use tracker::Tracker;
pub use types::*;
