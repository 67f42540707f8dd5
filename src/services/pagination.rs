use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::ApiConfig;
use crate::validation::SchemaError;

/// `page` / `limit` as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PageParams {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: Option<u32>,
}

impl PageParams {
    /// Applies defaults and the configured ceiling on `limit`.
    pub fn resolve(&self, api: &ApiConfig) -> Result<PageRequest, SchemaError> {
        let limit = self.limit.unwrap_or(api.default_page_size);
        if limit > api.max_page_size {
            return Err(SchemaError::single(
                Some("limit".to_string()),
                "range",
                format!("Limit must be at most {}", api.max_page_size),
            ));
        }
        Ok(PageRequest { page: self.page.unwrap_or(1).max(1), limit: limit.max(1) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PageRequest {
    pub fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit.max(1));
        Self {
            items,
            pagination: Pagination {
                page: request.page,
                limit: request.limit,
                total,
                total_pages: total.div_ceil(limit),
            },
        }
    }
}
