//! Core types for the sales tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in time, persisted in UTC. Day boundaries are computed in local time.
pub type Timestamp = DateTime<Utc>;

/// Placeholder the dashboard shows when a total is missing.
pub const UNAVAILABLE: &str = "N/A";

/// One scraped product reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Product name (the key across snapshots).
    pub name: String,

    /// Cumulative sales counter shown on the dashboard.
    pub total_sales: u64,

    /// Open support requests for the product.
    pub pending_requests: u64,

    /// Link to the product page (may be empty).
    pub product_url: String,

    /// When this reading was taken.
    pub observed_at: Timestamp,
}

impl RawObservation {
    pub fn new(name: impl Into<String>, total_sales: u64, observed_at: Timestamp) -> Self {
        Self {
            name: name.into(),
            total_sales,
            pending_requests: 0,
            product_url: String::new(),
            observed_at,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.product_url = url.into();
        self
    }

    pub fn with_pending(mut self, pending_requests: u64) -> Self {
        self.pending_requests = pending_requests;
        self
    }
}

/// Dashboard-level totals, passed through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTotals {
    pub total_sales: String,
    pub total_earnings: String,
}

impl DashboardTotals {
    pub fn new(total_sales: impl Into<String>, total_earnings: impl Into<String>) -> Self {
        Self {
            total_sales: total_sales.into(),
            total_earnings: total_earnings.into(),
        }
    }

    /// Totals for a page where neither figure could be read.
    pub fn unavailable() -> Self {
        Self::new(UNAVAILABLE, UNAVAILABLE)
    }
}

impl Default for DashboardTotals {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Everything a single scrape hands to the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationBatch {
    /// Product readings, in page order.
    pub observations: Vec<RawObservation>,

    /// Dashboard totals.
    pub totals: DashboardTotals,

    /// Capture time of the scrape.
    pub captured_at: Timestamp,
}

impl ObservationBatch {
    pub fn new(
        observations: Vec<RawObservation>,
        totals: DashboardTotals,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            observations,
            totals,
            captured_at,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Persisted view of one product across snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,

    /// Latest known cumulative count.
    pub total_sales: u64,

    /// Cumulative count at the previous snapshot (0 for new products).
    pub previous_sales: u64,

    /// `total_sales - previous_sales`. Negative when the source counter went down.
    pub sales_difference: i64,

    /// Positive deltas accrued since local midnight.
    pub todays_sales: u64,

    /// Pending requests from the latest observation.
    #[serde(default)]
    pub pending_requests: u64,

    /// Time of the reconciliation that produced this record.
    pub last_updated: Timestamp,

    pub product_url: String,
}

impl ProductRecord {
    /// True when the last reconciliation saw the counter move.
    pub fn has_changed(&self) -> bool {
        self.sales_difference != 0
    }
}

impl fmt::Display for ProductRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (total {}, {:+}, today {})",
            self.name, self.total_sales, self.sales_difference, self.todays_sales
        )
    }
}

/// The persisted unit: all tracked products plus dashboard totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Products in scrape order, unique by name.
    pub products: Vec<ProductRecord>,

    pub dashboard_totals: DashboardTotals,

    pub last_scraped: Timestamp,
}

impl Snapshot {
    /// Snapshot with no products.
    pub fn empty(at: Timestamp) -> Self {
        Self {
            products: Vec::new(),
            dashboard_totals: DashboardTotals::unavailable(),
            last_scraped: at,
        }
    }

    /// Look up a product by exact name.
    pub fn get(&self, name: &str) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products whose last reconciliation moved the counter.
    pub fn changed_products(&self) -> impl Iterator<Item = &ProductRecord> + '_ {
        self.products.iter().filter(|p| p.has_changed())
    }
}
