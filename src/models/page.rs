//! Pagination types.

use serde::{Deserialize, Serialize};

/// A request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PageRequest {
    /// Creates a page request, clamping both values to at least 1.
    #[must_use]
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Returns the row offset of the first item on this page.
    ///
    /// Saturates for page numbers past the addressable range.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    /// Requested page size.
    pub per_page: usize,
    /// Total number of items across all pages.
    pub total: usize,
    /// Last page number; at least 1.
    pub last_page: usize,
}

impl<T> Page<T> {
    /// Builds a page from its items and the overall total.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: usize) -> Self {
        let last_page = total.div_ceil(request.per_page).max(1);
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            last_page,
        }
    }

    /// Returns whether a page after this one exists.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page < self.last_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 1, 1 ; "empty table still has one page")]
    #[test_case(10, 10, 1 ; "exact fit")]
    #[test_case(11, 10, 2 ; "one extra item spills over")]
    #[test_case(25, 10, 3 ; "partial last page")]
    fn test_last_page(total: usize, per_page: usize, expected: usize) {
        let page: Page<()> = Page::new(Vec::new(), PageRequest::new(1, per_page), total);
        assert_eq!(page.last_page, expected);
    }

    #[test]
    fn test_page_request_clamps() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_offset_saturates_for_huge_pages() {
        assert_eq!(PageRequest::new(usize::MAX, 10).offset(), usize::MAX);
        assert_eq!(PageRequest::new(usize::MAX / 2, 4).offset(), usize::MAX);
    }

    #[test]
    fn test_has_more() {
        let page: Page<u8> = Page::new(vec![1], PageRequest::new(1, 1), 2);
        assert!(page.has_more());
        let page: Page<u8> = Page::new(vec![2], PageRequest::new(2, 1), 2);
        assert!(!page.has_more());
    }
}
