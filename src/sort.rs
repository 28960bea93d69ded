//! Ordering product lists for display.
//!
//! Sorting never mutates its input and is stable: rows with equal keys keep
//! their relative order, so repeated re-sorts don't reshuffle the view.
//! Names are compared with Unicode collation, ignoring case.
//! The direction flips the comparison only; ties still follow input order.

use crate::types::ProductRecord;
use icu_collator::{Collator, CollatorOptions, Strength};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// Column a product list can be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Name,
    TotalSales,
    TodaysSales,
    SalesDifference,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Name,
        SortKey::TotalSales,
        SortKey::TodaysSales,
        SortKey::SalesDifference,
    ];

    /// Parse a key as sent by a presentation layer.
    ///
    /// Accepts kebab, snake and camel spellings (`total-sales`,
    /// `total_sales`, `totalSales`). Unknown keys give `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "name" => Some(SortKey::Name),
            "totalsales" => Some(SortKey::TotalSales),
            "todayssales" => Some(SortKey::TodaysSales),
            "salesdifference" => Some(SortKey::SalesDifference),
            _ => None,
        }
    }

    /// Direction used when this key is first selected.
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortKey::Name => SortDirection::Ascending,
            _ => SortDirection::Descending,
        }
    }

    fn compare(self, names: &NameCollator, a: &ProductRecord, b: &ProductRecord) -> Ordering {
        match self {
            SortKey::Name => names.compare(&a.name, &b.name),
            SortKey::TotalSales => a.total_sales.cmp(&b.total_sales),
            SortKey::TodaysSales => a.todays_sales.cmp(&b.todays_sales),
            SortKey::SalesDifference => a.sales_difference.cmp(&b.sales_difference),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Name => "name",
            SortKey::TotalSales => "total-sales",
            SortKey::TodaysSales => "todays-sales",
            SortKey::SalesDifference => "sales-difference",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// Case-insensitive, locale-aware name comparison.
///
/// Root-locale Unicode collation at secondary strength: accents count,
/// case does not. Names differing only in case compare equal and keep
/// their input order.
struct NameCollator {
    collator: Option<Collator>,
}

impl NameCollator {
    fn new() -> Self {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Secondary);

        let collator = match Collator::try_new(&Default::default(), options) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "Collation data unavailable, comparing lowercased names");
                None
            }
        };
        Self { collator }
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(c) => c.compare(a, b),
            None => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
        }
    }
}

/// Return a sorted copy of `products`.
pub fn sort_products(
    products: &[ProductRecord],
    key: SortKey,
    direction: SortDirection,
) -> Vec<ProductRecord> {
    let names = NameCollator::new();
    let mut sorted = products.to_vec();
    // `sort_by` is stable.
    sorted.sort_by(|a, b| direction.apply(key.compare(&names, a, b)));
    sorted
}

/// Sort by a key given as text. Unrecognized keys return the input order.
pub fn sort_products_by(
    products: &[ProductRecord],
    key: &str,
    direction: SortDirection,
) -> Vec<ProductRecord> {
    match SortKey::parse(key) {
        Some(k) => sort_products(products, k, direction),
        None => products.to_vec(),
    }
}

/// Last chosen key and direction of a product list view.
///
/// Choosing the active key again flips the direction; choosing another key
/// switches to it with that key's default direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            key: SortKey::Name,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortState {
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.reversed();
        } else {
            self.key = key;
            self.direction = key.default_direction();
        }
    }

    pub fn apply(&self, products: &[ProductRecord]) -> Vec<ProductRecord> {
        sort_products(products, self.key, self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn p(name: &str, total: u64, today: u64, diff: i64) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            total_sales: total,
            previous_sales: 0,
            sales_difference: diff,
            todays_sales: today,
            pending_requests: 0,
            last_updated: Utc::now(),
            product_url: String::new(),
        }
    }

    fn names(products: &[ProductRecord]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_ties_keep_input_order() {
        let input = vec![p("B", 5, 0, 0), p("A", 5, 0, 0)];

        let by_total = sort_products(&input, SortKey::TotalSales, SortDirection::Ascending);
        assert_eq!(names(&by_total), vec!["B", "A"]);

        let by_total_desc = sort_products(&input, SortKey::TotalSales, SortDirection::Descending);
        assert_eq!(names(&by_total_desc), vec!["B", "A"]);

        let by_name = sort_products(&input, SortKey::Name, SortDirection::Ascending);
        assert_eq!(names(&by_name), vec!["A", "B"]);
    }

    #[test]
    fn test_input_is_untouched() {
        let input = vec![p("b", 1, 0, 0), p("a", 2, 0, 0)];
        let _ = sort_products(&input, SortKey::Name, SortDirection::Ascending);
        assert_eq!(names(&input), vec!["b", "a"]);
    }

    #[test]
    fn test_name_is_case_insensitive() {
        let input = vec![p("banana", 0, 0, 0), p("Apple", 0, 0, 0), p("cherry", 0, 0, 0)];
        let sorted = sort_products(&input, SortKey::Name, SortDirection::Ascending);
        assert_eq!(names(&sorted), vec!["Apple", "banana", "cherry"]);

        let sorted = sort_products(&input, SortKey::Name, SortDirection::Descending);
        assert_eq!(names(&sorted), vec!["cherry", "banana", "Apple"]);
    }

    #[test]
    fn test_name_collation_handles_accents_and_punctuation() {
        let input = vec![
            p("Zebra Layouts", 0, 0, 0),
            p("Élégant Pack", 0, 0, 0),
            p("apple-kit", 0, 0, 0),
            p("Apple Kit", 0, 0, 0),
            p("eclipse", 0, 0, 0),
        ];
        let sorted = sort_products(&input, SortKey::Name, SortDirection::Ascending);
        let order = names(&sorted);

        let mut apples = order[..2].to_vec();
        apples.sort();
        assert_eq!(apples, vec!["Apple Kit", "apple-kit"]);
        assert_eq!(&order[2..], &["eclipse", "Élégant Pack", "Zebra Layouts"]);
    }

    #[test]
    fn test_names_differing_in_case_keep_input_order() {
        let input = vec![p("kit", 0, 0, 0), p("KIT", 0, 0, 0), p("Kit", 0, 0, 0)];
        let sorted = sort_products(&input, SortKey::Name, SortDirection::Ascending);
        assert_eq!(names(&sorted), vec!["kit", "KIT", "Kit"]);
    }

    #[test]
    fn test_numeric_keys() {
        let input = vec![p("A", 3, 1, -2), p("B", 10, 0, 4), p("C", 1, 7, 0)];

        let s = sort_products(&input, SortKey::TotalSales, SortDirection::Descending);
        assert_eq!(names(&s), vec!["B", "A", "C"]);

        let s = sort_products(&input, SortKey::TodaysSales, SortDirection::Descending);
        assert_eq!(names(&s), vec!["C", "A", "B"]);

        let s = sort_products(&input, SortKey::SalesDifference, SortDirection::Ascending);
        assert_eq!(names(&s), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_unknown_key_is_noop() {
        let input = vec![p("B", 1, 0, 0), p("A", 2, 0, 0)];
        let s = sort_products_by(&input, "popularity", SortDirection::Ascending);
        assert_eq!(names(&s), vec!["B", "A"]);

        let s = sort_products_by(&input, "totalSales", SortDirection::Descending);
        assert_eq!(names(&s), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_spellings() {
        assert_eq!(SortKey::parse("name"), Some(SortKey::Name));
        assert_eq!(SortKey::parse("total-sales"), Some(SortKey::TotalSales));
        assert_eq!(SortKey::parse("todays_sales"), Some(SortKey::TodaysSales));
        assert_eq!(SortKey::parse("salesDifference"), Some(SortKey::SalesDifference));
        assert_eq!(SortKey::parse("price"), None);

        for key in SortKey::ALL {
            assert_eq!(SortKey::parse(&key.to_string()), Some(key));
        }

        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Ascending));
        assert_eq!(SortDirection::parse("desc"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::parse("up"), None);
    }

    #[test]
    fn test_sort_state_toggles() {
        let mut state = SortState::default();

        state.select(SortKey::TotalSales);
        assert_eq!(state.direction, SortDirection::Descending);

        state.select(SortKey::TotalSales);
        assert_eq!(state.direction, SortDirection::Ascending);

        state.select(SortKey::Name);
        assert_eq!(state.key, SortKey::Name);
        assert_eq!(state.direction, SortDirection::Ascending);

        state.select(SortKey::Name);
        assert_eq!(state.direction, SortDirection::Descending);

        let input = vec![p("a", 0, 0, 0), p("b", 0, 0, 0)];
        assert_eq!(names(&state.apply(&input)), vec!["b", "a"]);
    }
}
