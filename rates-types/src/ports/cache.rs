//! Exchange rate cache port.
//!
//! Adapters (in-memory, SQLite) implement this trait. Callers rely only on the
//! operations below, never on backend-specific behavior.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::{CacheEntryId, CurrencyCode, ExchangeRateCacheEntry};
use crate::error::RepoError;

/// Store of materialized rate records keyed by currency and date.
///
/// For any currency at most one entry is flagged `is_latest`. Only
/// [`swap_latest`](ExchangeRateCache::swap_latest) moves that flag; every other
/// write leaves it where it is.
#[async_trait::async_trait]
pub trait ExchangeRateCache: Send + Sync + 'static {
    async fn find_latest(
        &self,
        currency: CurrencyCode,
    ) -> Result<Option<ExchangeRateCacheEntry>, RepoError>;

    async fn find_for_date(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRateCacheEntry>, RepoError>;

    async fn find_latest_for_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError>;

    async fn find_for_date_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
        date: NaiveDate,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError>;

    async fn find_all_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, RepoError>;

    async fn find_all_non_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, RepoError>;

    /// Upserts entries by id.
    ///
    /// New entries are stored as historical; existing entries keep their flag.
    async fn save_all(
        &self,
        entries: Vec<ExchangeRateCacheEntry>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError>;

    /// Atomically promotes `candidate` to latest for `currency`.
    ///
    /// Succeeds only if the current latest id still equals `expected`
    /// (`None` meaning no latest entry); otherwise returns
    /// [`RepoError::Conflict`] and changes nothing.
    async fn swap_latest(
        &self,
        currency: CurrencyCode,
        expected: Option<CacheEntryId>,
        candidate: ExchangeRateCacheEntry,
    ) -> Result<ExchangeRateCacheEntry, RepoError>;

    /// Deletes the given entries, returning how many existed.
    async fn delete_all(&self, entries: &[ExchangeRateCacheEntry]) -> Result<u64, RepoError>;

    /// Deletes every entry.
    async fn purge(&self) -> Result<u64, RepoError>;
}
