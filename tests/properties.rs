//! Property tests for reconciliation and sorting invariants.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use salestally::{
    reconcile_in, select_for_export, sort_products, DashboardTotals, ObservationBatch,
    RawObservation, SortDirection, SortKey,
};

fn batch_of(counts: &[(u8, u64)], hour: i64) -> ObservationBatch {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
    ObservationBatch::new(
        counts
            .iter()
            .map(|(id, total)| RawObservation::new(format!("product-{}", id), *total, now))
            .collect(),
        DashboardTotals::unavailable(),
        now,
    )
}

proptest! {
    #[test]
    fn new_products_start_from_zero(counts in prop::collection::vec((0u8..20, 0u64..10_000), 0..30)) {
        let b = batch_of(&counts, 0);
        let next = reconcile_in(None, &b, b.captured_at, &Utc);

        for p in &next.products {
            prop_assert_eq!(p.previous_sales, 0);
            prop_assert_eq!(p.sales_difference, p.total_sales as i64);
            prop_assert_eq!(p.todays_sales, p.total_sales);
        }
    }

    #[test]
    fn names_stay_unique(counts in prop::collection::vec((0u8..8, 0u64..100), 0..40)) {
        let b = batch_of(&counts, 0);
        let next = reconcile_in(None, &b, b.captured_at, &Utc);

        let mut names: Vec<_> = next.products.iter().map(|p| p.name.clone()).collect();
        let len = names.len();
        names.sort();
        names.dedup();
        prop_assert_eq!(names.len(), len);
    }

    #[test]
    fn difference_is_total_minus_previous(
        first in prop::collection::vec(0u64..1_000, 1..10),
        second in prop::collection::vec(0u64..1_000, 1..10),
        gap_hours in 0i64..72,
    ) {
        let a: Vec<(u8, u64)> = first.iter().enumerate().map(|(i, t)| (i as u8, *t)).collect();
        let b: Vec<(u8, u64)> = second.iter().enumerate().map(|(i, t)| (i as u8, *t)).collect();

        let b1 = batch_of(&a, 0);
        let s1 = reconcile_in(None, &b1, b1.captured_at, &Utc);
        let b2 = batch_of(&b, gap_hours);
        let s2 = reconcile_in(Some(&s1), &b2, b2.captured_at, &Utc);

        for p in &s2.products {
            prop_assert_eq!(p.sales_difference, p.total_sales as i64 - p.previous_sales as i64);
            if let Some(prior) = s1.get(&p.name) {
                prop_assert_eq!(p.previous_sales, prior.total_sales);
                if p.sales_difference <= 0 {
                    prop_assert_eq!(p.todays_sales, prior.todays_sales);
                }
            }
        }
        prop_assert!(s2.products.len() <= second.len());
    }

    #[test]
    fn export_keeps_exactly_the_changed(
        first in prop::collection::vec(0u64..50, 1..10),
        second in prop::collection::vec(0u64..50, 1..10),
    ) {
        let a: Vec<(u8, u64)> = first.iter().enumerate().map(|(i, t)| (i as u8, *t)).collect();
        let b: Vec<(u8, u64)> = second.iter().enumerate().map(|(i, t)| (i as u8, *t)).collect();

        let b1 = batch_of(&a, 0);
        let s1 = reconcile_in(None, &b1, b1.captured_at, &Utc);
        let b2 = batch_of(&b, 1);
        let s2 = reconcile_in(Some(&s1), &b2, b2.captured_at, &Utc);

        let rows = select_for_export(&s2, b2.captured_at);
        let expected: Vec<_> = s2.products.iter().filter(|p| p.sales_difference != 0).map(|p| p.name.clone()).collect();
        let got: Vec<_> = rows.iter().map(|r| r.name.clone()).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn sort_is_a_stable_permutation(counts in prop::collection::vec((0u8..50, 0u64..5), 0..30)) {
        let b = batch_of(&counts, 0);
        let s = reconcile_in(None, &b, b.captured_at, &Utc);

        let sorted = sort_products(&s.products, SortKey::TotalSales, SortDirection::Descending);
        prop_assert_eq!(sorted.len(), s.products.len());

        for w in sorted.windows(2) {
            prop_assert!(w[0].total_sales >= w[1].total_sales);
            if w[0].total_sales == w[1].total_sales {
                let i0 = s.products.iter().position(|p| p.name == w[0].name).unwrap();
                let i1 = s.products.iter().position(|p| p.name == w[1].name).unwrap();
                prop_assert!(i0 < i1);
            }
        }
    }
}
