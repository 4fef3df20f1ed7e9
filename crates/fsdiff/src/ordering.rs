//! Test-case ordering and range selection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

fn numeric(name: &str) -> Option<u64> {
    name.parse().ok()
}

/// Numeric names ascend by value and sort after every non-numeric name;
/// non-numeric names compare lexicographically.
pub fn compare_test_names(a: &str, b: &str) -> Ordering {
    match (numeric(a), numeric(b)) {
        // "01" and "1" share a value; fall back to text so the order stays total.
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Inclusive bounds on numeric test-case names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRange {
    pub first: Option<u64>,
    pub last: Option<u64>,
}

impl TestRange {
    pub fn new(first: Option<u64>, last: Option<u64>) -> Self {
        Self { first, last }
    }

    /// Non-numeric names are always included.
    pub fn includes(&self, name: &str) -> bool {
        let Some(value) = numeric(name) else {
            return true;
        };
        self.first.map_or(true, |first| first <= value)
            && self.last.map_or(true, |last| value <= last)
    }
}

/// Filter `items` by `range` and sort what remains with [`compare_test_names`].
pub fn select<T, F>(items: Vec<T>, range: TestRange, name: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut selected: Vec<T> = items
        .into_iter()
        .filter(|item| range.includes(name(item)))
        .collect();
    selected.sort_by(|a, b| compare_test_names(name(a), name(b)));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_non_numeric_first_then_numeric_ascending() {
        let ordered = select(
            names(&["10", "2", "abc", "1"]),
            TestRange::default(),
            |s| s.as_str(),
        );
        assert_eq!(ordered, vec!["abc", "1", "2", "10"]);
    }

    #[test]
    fn test_non_numeric_lexicographic() {
        assert_eq!(compare_test_names("b", "a"), Ordering::Greater);
        assert_eq!(compare_test_names("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn test_range_filters_only_numeric() {
        let selected = select(
            names(&["1", "2", "3", "6", "abc"]),
            TestRange::new(Some(2), Some(5)),
            |s| s.as_str(),
        );
        assert_eq!(selected, vec!["abc", "2", "3"]);
    }

    #[test]
    fn test_open_ended_ranges() {
        let from = TestRange::new(Some(3), None);
        assert!(!from.includes("2"));
        assert!(from.includes("300"));

        let to = TestRange::new(None, Some(3));
        assert!(to.includes("0"));
        assert!(!to.includes("4"));
        assert!(to.includes("zzz"));
    }

    #[test]
    fn test_equal_values_order_by_text() {
        assert_eq!(compare_test_names("01", "1"), Ordering::Less);
        assert_eq!(compare_test_names("1", "1"), Ordering::Equal);
    }
}
