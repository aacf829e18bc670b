// ============================================================================
// Sort descriptors
// ============================================================================
//
// Multi-key stable ordering over attribute values. NULLs sort last for
// ascending keys and first for descending keys. Values of incompatible types
// compare as equal so a single odd row cannot fail a fetch.
//
// ============================================================================

use crate::core::{Row, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn new(key: impl Into<String>, ascending: bool) -> Self {
        Self {
            key: key.into(),
            ascending,
        }
    }

    pub fn ascending(key: impl Into<String>) -> Self {
        Self::new(key, true)
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self::new(key, false)
    }

    pub fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        let left = a.get(&self.key).unwrap_or(&Value::Null);
        let right = b.get(&self.key).unwrap_or(&Value::Null);

        // Value::compare puts NULL last; reversing moves it first for descending keys
        let ordering = left.compare(right).unwrap_or(Ordering::Equal);
        if self.ascending { ordering } else { ordering.reverse() }
    }
}

/// Compares two rows by a list of descriptors, first descriptor first.
pub fn compare_by(descriptors: &[SortDescriptor], a: &Row, b: &Row) -> Ordering {
    for descriptor in descriptors {
        match descriptor.compare_rows(a, b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: Option<&str>, rank: i64) -> Row {
        let mut row = Row::new();
        row.insert("name".into(), Value::from(name));
        row.insert("rank".into(), Value::Integer(rank));
        row
    }

    #[test]
    fn test_multi_key_sort() {
        let mut rows = vec![row(Some("b"), 1), row(Some("a"), 2), row(Some("a"), 1)];
        let descriptors = [SortDescriptor::ascending("name"), SortDescriptor::descending("rank")];
        rows.sort_by(|a, b| compare_by(&descriptors, a, b));
        let got: Vec<_> = rows
            .iter()
            .map(|r| (r["name"].to_string(), r["rank"].as_i64().unwrap()))
            .collect();
        assert_eq!(
            got,
            vec![("a".to_string(), 2), ("a".to_string(), 1), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn test_nulls_last_ascending_first_descending() {
        let mut rows = vec![row(None, 0), row(Some("a"), 0)];
        rows.sort_by(|a, b| compare_by(&[SortDescriptor::ascending("name")], a, b));
        assert!(rows[1]["name"].is_null());

        rows.sort_by(|a, b| compare_by(&[SortDescriptor::descending("name")], a, b));
        assert!(rows[0]["name"].is_null());
    }
}
