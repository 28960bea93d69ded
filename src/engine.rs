//! Snapshot reconciliation.
//!
//! Merges a freshly scraped [`ObservationBatch`] into the previously
//! persisted [`Snapshot`], producing the next snapshot with per-product
//! deltas and a "sold today" counter that resets at local midnight.
//!
//! The engine is pure: no I/O, no clock reads beyond the `now` argument.
//! Callers must serialize calls (see [`crate::tracker::Tracker`]); two
//! interleaved read-modify-write cycles lose one cycle's accumulation.

use crate::types::{ObservationBatch, ProductRecord, RawObservation, Snapshot, Timestamp};
use chrono::{Local, NaiveDate, TimeZone};
use std::collections::HashMap;

/// Counts describing how a reconciliation changed the product set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Products seen for the first time.
    pub new: usize,
    /// Matched products whose counter went up.
    pub increased: usize,
    /// Matched products whose counter went down.
    pub decreased: usize,
    /// Matched products with no change.
    pub unchanged: usize,
    /// Previously tracked products missing from the batch.
    pub dropped: usize,
}

impl ReconcileStats {
    /// Whether any product moved or appeared.
    pub fn has_changes(&self) -> bool {
        self.new + self.increased + self.decreased > 0
    }
}

/// Reconcile using the machine's local timezone for day boundaries.
pub fn reconcile(previous: Option<&Snapshot>, batch: &ObservationBatch, now: Timestamp) -> Snapshot {
    reconcile_in(previous, batch, now, &Local)
}

/// Reconcile with day boundaries computed in `tz`.
///
/// Products absent from `batch` are dropped: a scrape is a full picture of
/// the dashboard. When a batch repeats a name, the first occurrence keeps
/// its position and the last one supplies the values; every occurrence is
/// reconciled against `previous`, never against an earlier duplicate.
pub fn reconcile_in<Tz: TimeZone>(
    previous: Option<&Snapshot>,
    batch: &ObservationBatch,
    now: Timestamp,
    tz: &Tz,
) -> Snapshot {
    let prior: HashMap<&str, &ProductRecord> = previous
        .map(|s| s.products.iter().map(|p| (p.name.as_str(), p)).collect())
        .unwrap_or_default();

    let today = local_date(&now, tz);
    let mut products: Vec<ProductRecord> = Vec::with_capacity(batch.observations.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(batch.observations.len());

    for obs in &batch.observations {
        let record = match prior.get(obs.name.as_str()) {
            Some(p) => update_product(p, obs, now, local_date(&p.last_updated, tz) == today),
            None => new_product(obs, now),
        };

        match positions.get(&record.name) {
            Some(&ix) => products[ix] = record,
            None => {
                positions.insert(record.name.clone(), products.len());
                products.push(record);
            }
        }
    }

    Snapshot {
        products,
        dashboard_totals: batch.totals.clone(),
        last_scraped: batch.captured_at,
    }
}

/// Record for a product with no prior history: everything counts as new.
fn new_product(obs: &RawObservation, now: Timestamp) -> ProductRecord {
    ProductRecord {
        name: obs.name.clone(),
        total_sales: obs.total_sales,
        previous_sales: 0,
        sales_difference: signed_delta(obs.total_sales, 0),
        todays_sales: obs.total_sales,
        pending_requests: obs.pending_requests,
        last_updated: now,
        product_url: obs.product_url.clone(),
    }
}

/// Apply one observation to a known product.
fn update_product(
    prior: &ProductRecord,
    obs: &RawObservation,
    now: Timestamp,
    same_day: bool,
) -> ProductRecord {
    let sales_difference = signed_delta(obs.total_sales, prior.total_sales);

    let todays_sales = if sales_difference > 0 {
        let gained = sales_difference.unsigned_abs();
        if same_day {
            prior.todays_sales.saturating_add(gained)
        } else {
            gained
        }
    } else {
        // Zero or negative: carry forward, whatever the day.
        prior.todays_sales
    };

    ProductRecord {
        name: obs.name.clone(),
        total_sales: obs.total_sales,
        previous_sales: prior.total_sales,
        sales_difference,
        todays_sales,
        pending_requests: obs.pending_requests,
        last_updated: now,
        product_url: obs.product_url.clone(),
    }
}

/// `new - old` as a signed value, clamped to the `i64` range.
fn signed_delta(new: u64, old: u64) -> i64 {
    let d = i128::from(new) - i128::from(old);
    d.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Calendar date of `t` in `tz`.
pub fn local_date<Tz: TimeZone>(t: &Timestamp, tz: &Tz) -> NaiveDate {
    t.with_timezone(tz).date_naive()
}

/// Summarize how `next` differs from `previous`.
pub fn diff_stats(previous: Option<&Snapshot>, next: &Snapshot) -> ReconcileStats {
    let mut stats = ReconcileStats::default();

    for p in &next.products {
        let known = previous.is_some_and(|s| s.get(&p.name).is_some());
        if !known {
            stats.new += 1;
        } else if p.sales_difference > 0 {
            stats.increased += 1;
        } else if p.sales_difference < 0 {
            stats.decreased += 1;
        } else {
            stats.unchanged += 1;
        }
    }

    if let Some(prev) = previous {
        stats.dropped = prev
            .products
            .iter()
            .filter(|p| next.get(&p.name).is_none())
            .count();
    }

    stats
}
