//! Page-number pagination with `page` (1-based) and `limit` query parameters,
//! answered as `{count, next, previous, results}`.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl PageParams {
    pub fn resolve(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Splits `items` into the total count and the requested page.
    pub fn slice<T>(&self, items: Vec<T>) -> (u64, Vec<T>) {
        let total = items.len() as u64;
        let offset = (self.page - 1).saturating_mul(self.limit);
        let page_items = items
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(self.limit as usize)
            .collect();
        (total, page_items)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(count: u64, results: Vec<T>, params: PageParams, uri: &Uri) -> Self {
        let has_next = params.page.saturating_mul(params.limit) < count;
        let has_previous = params.page > 1;
        Self {
            count,
            next: has_next.then(|| page_link(uri, params.page + 1)),
            previous: has_previous.then(|| page_link(uri, params.page - 1)),
            results,
        }
    }
}

/// `uri` with its `page` parameter replaced. Other parameters are kept as
/// received, still percent-encoded.
pub fn page_link(uri: &Uri, page: u64) -> String {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("page"))
        .collect();
    let page_pair = format!("page={page}");
    pairs.push(&page_pair);
    format!("{}?{}", uri.path(), pairs.join("&"))
}
