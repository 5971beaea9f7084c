use serde::{Deserialize, Serialize};

use crate::i18n::{LocalizedMessage, MessageKey};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Envelope for every successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: LocalizedMessage,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(key: MessageKey, data: T) -> Self {
        Self {
            success: true,
            message: key.message(),
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, page: Pagination) -> Self {
        Self {
            total: items.len(),
            items,
            limit: page.limit,
            offset: page.offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    /// Clamp client supplied paging into the accepted range.
    pub fn from_query(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_query(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let page = Pagination::from_query(Some(1000), Some(-4));
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset, 0);

        let page = Pagination::from_query(None, None);
        assert_eq!(page.limit, DEFAULT_PAGE_SIZE);
    }
}
