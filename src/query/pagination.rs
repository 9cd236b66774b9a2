//! Pagination
//!
//! Pagination is not a plan stage: the executor applies it after the plan
//! is final and reports totals alongside the page.

use serde::{Deserialize, Serialize};

/// Requested page, already clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    /// Rows per page
    pub per_page: u32,
}

impl PageRequest {
    /// Builds a request, clamping `per_page` into `[1, max_per_page]` and
    /// `page` to at least 1.
    pub fn new(page: u32, per_page: u32, max_per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, max_per_page.max(1)),
        }
    }

    /// Number of rows to skip
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }

    pub fn limit(&self) -> usize {
        self.per_page as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 15,
        }
    }
}

/// Totals reported with every page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Rows on this page
    pub count: usize,
    /// Rows matching the plan across all pages
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl PageMeta {
    pub fn new(request: &PageRequest, count: usize, total: usize) -> Self {
        let per_page = request.per_page.max(1) as usize;
        let total_pages = total.div_ceil(per_page);
        Self {
            count,
            total,
            page: request.page,
            per_page: request.per_page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }
}

/// One page of rows plus totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: &PageRequest, total: usize) -> Self {
        let meta = PageMeta::new(request, data.len(), total);
        Self { data, meta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        assert_eq!(PageRequest::new(1, 500, 100).per_page, 100);
        assert_eq!(PageRequest::new(1, 0, 100).per_page, 1);
        assert_eq!(PageRequest::new(0, 15, 100).page, 1);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(3, 20, 100);
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_meta_total_pages() {
        let req = PageRequest::new(2, 15, 100);
        let meta = PageMeta::new(&req, 15, 31);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.page, 2);

        let empty = PageMeta::new(&req, 0, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_serialization() {
        let page = Page::new(vec![serde_json::json!({"id": 1})], &PageRequest::default(), 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["meta"]["count"], 1);
        assert_eq!(json["meta"]["per_page"], 15);
        assert_eq!(json["meta"]["total_pages"], 1);
    }
}
