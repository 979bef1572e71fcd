use std::cmp::Ordering;

use keyline_types::{BaseInfo, Model};
use serde::Serialize;

/// Result of a list call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListOutput<M> {
    /// Records after filter, format, sort and pagination.
    pub rows: Vec<M>,
    /// Number of records after filtering, before pagination.
    pub total_size: usize,
}

/// Slice out page `page` (1-based) of `page_size` rows.
///
/// Non-positive `page` or `page_size` disables pagination. A page starting
/// beyond the end yields no rows.
pub fn paginate<T>(mut rows: Vec<T>, page: i64, page_size: i64) -> Vec<T> {
    if page <= 0 || page_size <= 0 {
        return rows;
    }
    let skip = (page - 1).saturating_mul(page_size);
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    if skip >= rows.len() {
        return Vec::new();
    }
    let size = usize::try_from(page_size).unwrap_or(usize::MAX);
    rows.drain(..skip);
    rows.truncate(size);
    rows
}

/// Default list order: newest `update_time` first, then newest
/// `create_time`, then ascending id (lexicographic).
///
/// Models without base info compare as an all-default block, so they keep
/// their scan (key) order.
pub fn default_order<M: Model>(a: &M, b: &M) -> Ordering {
    let empty = BaseInfo::default();
    let a = a.base_info().unwrap_or(&empty);
    let b = b.base_info().unwrap_or(&empty);
    b.update_time
        .cmp(&a.update_time)
        .then_with(|| b.create_time.cmp(&a.create_time))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        #[serde(flatten)]
        base: BaseInfo,
    }

    impl Model for Row {
        fn base_info(&self) -> Option<&BaseInfo> {
            Some(&self.base)
        }
    }

    fn row(id: &str, create_time: i64, update_time: i64) -> Row {
        Row {
            base: BaseInfo::new(id).with_times(create_time, update_time),
        }
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r.base.id.as_str()).collect()
    }

    // -----------------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------------

    #[test]
    fn pagination_disabled_for_non_positive_values() {
        let rows = vec![1, 2, 3];
        assert_eq!(paginate(rows.clone(), 0, 2), vec![1, 2, 3]);
        assert_eq!(paginate(rows.clone(), 1, 0), vec![1, 2, 3]);
        assert_eq!(paginate(rows, -1, -1), vec![1, 2, 3]);
    }

    #[test]
    fn pagination_slices_pages() {
        let rows = vec![1, 2, 3];
        assert_eq!(paginate(rows.clone(), 1, 1), vec![1]);
        assert_eq!(paginate(rows.clone(), 2, 2), vec![3]);
        assert_eq!(paginate(rows.clone(), 1, 10), vec![1, 2, 3]);
        assert_eq!(paginate(rows, 3, 1), vec![3]);
    }

    #[test]
    fn pagination_beyond_end_is_empty() {
        let rows = vec![1, 2, 3];
        assert!(paginate(rows.clone(), 4, 2).is_empty());
        assert!(paginate(rows.clone(), 2, 3).is_empty());
        assert!(paginate(rows, i64::MAX, i64::MAX).is_empty());
    }

    // -----------------------------------------------------------------------
    // Default order
    // -----------------------------------------------------------------------

    #[test]
    fn newest_update_first() {
        let mut rows = vec![row("1", 11, 111), row("2", 22, 22), row("3", 33, 333)];
        rows.sort_by(default_order);
        assert_eq!(ids(&rows), vec!["3", "1", "2"]);
    }

    #[test]
    fn ties_fall_back_to_create_time_then_id() {
        let mut rows = vec![
            row("b", 1, 5),
            row("a", 1, 5),
            row("c", 2, 5),
            row("10", 1, 5),
        ];
        rows.sort_by(default_order);
        assert_eq!(ids(&rows), vec!["c", "10", "a", "b"]);
    }

    #[test]
    fn output_serializes_with_snake_case_names() {
        let out = ListOutput {
            rows: vec![row("1", 0, 0)],
            total_size: 3,
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json, serde_json::json!({"rows":[{"id":"1"}],"total_size":3}));
    }
}
