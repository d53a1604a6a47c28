//! `{data, pagination}` envelopes for ranked lists.
//!
//! `offset` is a zero-based **page index**, not an item index: page `n`
//! covers items `[n * limit, n * limit + limit)` and reports
//! `current_page = n + 1`. Dashboard clients depend on this.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
    pub total_pages: usize,
    pub current_page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Slice an already-sorted list. A zero `limit` yields an empty page.
pub fn paginate<T: Clone>(items: &[T], limit: usize, offset: usize) -> Paginated<T> {
    let total = items.len();
    let start = offset.saturating_mul(limit).min(total);
    let end = start.saturating_add(limit).min(total);
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
    Paginated {
        data: items[start..end].to_vec(),
        pagination: PaginationMeta {
            total,
            limit,
            offset,
            has_more: limit > 0 && offset.saturating_add(1).saturating_mul(limit) < total,
            total_pages,
            current_page: offset.saturating_add(1),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_a_page_index() {
        let page = paginate(&["a", "b", "c", "d", "e"], 2, 1);
        assert_eq!(page.data, vec!["c", "d"]);
        assert_eq!(page.pagination.current_page, 2);
        assert!(page.pagination.has_more);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn last_and_past_end_pages() {
        let items = [1, 2, 3, 4, 5];
        let last = paginate(&items, 2, 2);
        assert_eq!(last.data, vec![5]);
        assert!(!last.pagination.has_more);

        let beyond = paginate(&items, 2, 9);
        assert!(beyond.data.is_empty());
        assert_eq!(beyond.pagination.total, 5);
    }

    #[test]
    fn total_and_length_invariants() {
        let items: Vec<u32> = (0..37).collect();
        for limit in 1..12 {
            for offset in 0..8 {
                let page = paginate(&items, limit, offset);
                assert_eq!(page.pagination.total, items.len());
                assert!(page.data.len() <= limit);
            }
        }
    }

    #[test]
    fn zero_limit_is_empty() {
        let page = paginate(&[1, 2, 3], 0, 0);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_more);
    }

    #[test]
    fn huge_offset_saturates() {
        let page = paginate(&[1, 2, 3], 2, usize::MAX);
        assert!(page.data.is_empty());
        assert!(!page.pagination.has_more);
        assert_eq!(page.pagination.current_page, usize::MAX);
    }
}
