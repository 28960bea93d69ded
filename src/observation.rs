//! Building observations from scraped cell text.
//!
//! A scraper hands over whatever text it found in each cell. Numeric cells
//! are parsed leniently: a cell that cannot be read as a count becomes `0`
//! for that field only, so one bad cell never fails the whole batch.

use crate::types::{DashboardTotals, ObservationBatch, RawObservation, Timestamp, UNAVAILABLE};
use tracing::warn;

/// Name used when the product heading is missing.
pub const UNKNOWN_PRODUCT: &str = "Unknown";

/// Parse a dashboard counter.
///
/// Leading/trailing whitespace and an optional `+` are accepted, as are
/// `,` thousands separators between digits. Parsing stops at the first
/// character that is not part of the number, so `"12 sales"` reads as 12.
/// Returns `None` when no digits lead the text or the value is negative.
pub fn parse_count(text: &str) -> Option<u64> {
    let s = text.trim();
    let s = s.strip_prefix('+').unwrap_or(s);

    let mut value: u64 = 0;
    let mut seen_digit = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(d) = c.to_digit(10) {
            value = value.checked_mul(10)?.checked_add(u64::from(d))?;
            seen_digit = true;
        } else if c == ',' && seen_digit && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            continue;
        } else {
            break;
        }
    }

    seen_digit.then_some(value)
}

/// Parse a counter, coercing anything unreadable to `0`.
pub fn count_or_zero(field: &str, text: Option<&str>) -> u64 {
    match text {
        None => 0,
        Some(t) => parse_count(t).unwrap_or_else(|| {
            warn!(field, text = t, "Unparseable count, using 0");
            0
        }),
    }
}

/// Raw text of one product tile, as found on the page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrapedProduct {
    pub name: Option<String>,
    pub total_sales: Option<String>,
    pub pending_requests: Option<String>,
    pub product_url: Option<String>,
}

impl ScrapedProduct {
    /// Convert to an observation taken at `observed_at`.
    pub fn into_observation(self, observed_at: Timestamp) -> RawObservation {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());

        let total_sales = count_or_zero("total_sales", self.total_sales.as_deref());
        let pending_requests = count_or_zero("pending_requests", self.pending_requests.as_deref());

        RawObservation {
            name,
            total_sales,
            pending_requests,
            product_url: self.product_url.unwrap_or_default(),
            observed_at,
        }
    }
}

/// Assemble a batch from scraped tiles and dashboard totals text.
///
/// Missing totals fall back to the dashboard's `N/A` placeholder.
pub fn batch_from_scrape(
    products: Vec<ScrapedProduct>,
    total_sales: Option<&str>,
    total_earnings: Option<&str>,
    captured_at: Timestamp,
) -> ObservationBatch {
    let observations = products
        .into_iter()
        .map(|p| p.into_observation(captured_at))
        .collect();

    let totals = DashboardTotals::new(
        total_sales.map(str::trim).unwrap_or(UNAVAILABLE),
        total_earnings.map(str::trim).unwrap_or(UNAVAILABLE),
    );

    ObservationBatch::new(observations, totals, captured_at)
}
