//! Data Transfer Objects (DTOs) for requests and responses.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CurrencyCode, TrailOperation, TrailState};

// ─────────────────────────────────────────────────────────────────────────────
// Paging
// ─────────────────────────────────────────────────────────────────────────────

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 200;

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl PageRequest {
    /// Creates a page request, clamping the size to `1..=200`.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// Cuts a page out of an already ordered, fully materialized result set.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.size as usize)
            .collect();
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trail DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Filters for trail lookups; every filter is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<TrailOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TrailState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl TrailQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Latest-rate DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Optional comma-separated currency filter, e.g. `?currencies=EUR,USD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestRatesQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<String>,
}

impl LatestRatesQuery {
    /// Parsed filter; `None` when absent or empty. Unknown codes are dropped.
    pub fn currency_set(&self) -> Option<BTreeSet<CurrencyCode>> {
        let raw = self.currencies.as_deref()?;
        let set: BTreeSet<CurrencyCode> = raw
            .split(',')
            .map(CurrencyCode::from_code)
            .filter(CurrencyCode::is_defined)
            .collect();
        if set.is_empty() { None } else { Some(set) }
    }
}

/// Result of an administrative cache purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}
