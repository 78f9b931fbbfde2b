//! Pagination related types for list endpoints

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: u32,

    /// Number of items per page
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Create a new pagination, clamping out-of-range values
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Build from raw query values; anything unparsable falls back to the default
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> Self {
        let page = page.and_then(|p| p.trim().parse::<u32>().ok()).unwrap_or(1);
        let page_size = page_size
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(page, page_size)
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Slice an already-filtered, already-ordered collection
    pub fn apply<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let total = items.len() as u64;
        let data = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.page_size as usize)
            .collect();
        PaginatedResponse::new(data, *self, total)
    }
}

/// Paginated response wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// The items on this page
    pub results: Vec<T>,

    /// Current page number
    pub page: u32,

    /// Items per page
    pub page_size: u32,

    /// Total number of matching items
    pub count: u64,

    /// Total number of pages
    pub total_pages: u32,

    pub has_next: bool,

    pub has_prev: bool,
}

impl<T> PaginatedResponse<T> {
    /// Create a new paginated response
    pub fn new(results: Vec<T>, pagination: Pagination, count: u64) -> Self {
        let total_pages = Self::calculate_total_pages(count, pagination.page_size);
        Self {
            results,
            page: pagination.page,
            page_size: pagination.page_size,
            count,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }

    fn calculate_total_pages(total: u64, page_size: u32) -> u32 {
        if total == 0 {
            return 0;
        }
        total.div_ceil(u64::from(page_size)) as u32
    }

    /// Transform the items using a function
    pub fn map<U, F>(self, f: F) -> PaginatedResponse<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResponse {
            results: self.results.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            count: self.count,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_ignores_garbage() {
        let p = Pagination::from_query(Some("abc"), Some("-3"));
        assert_eq!(p, Pagination::default());

        let p = Pagination::from_query(Some("0"), Some("1000"));
        assert_eq!(p.page, 1);
        assert_eq!(p.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_apply_slices_and_reports_totals() {
        let page = Pagination::new(2, 2).apply((1..=5).collect::<Vec<_>>());
        assert_eq!(page.results, vec![3, 4]);
        assert_eq!(page.count, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let page = Pagination::new(9, 20).apply(vec!["a", "b"]);
        assert!(page.results.is_empty());
        assert_eq!(page.count, 2);
        assert!(!page.has_next);
    }
}
