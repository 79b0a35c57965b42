//! In-process adapters backed by `DashMap`.
//!
//! Lock order is always `latest` before `entries`; readers never hold a guard on
//! one map while touching the other.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use rates_types::{
    CacheEntryId, CurrencyCode, ExchangeRateCache, ExchangeRateCacheEntry, Page, PageRequest,
    RepoError, TrailId, TrailOperation, TrailRecord, TrailRepository, TrailState,
};

// ─────────────────────────────────────────────────────────────────────────────
// Exchange rate cache
// ─────────────────────────────────────────────────────────────────────────────

/// In-process exchange rate cache.
#[derive(Default)]
pub struct InMemoryRateCache {
    entries: DashMap<CacheEntryId, ExchangeRateCacheEntry>,
    latest: DashMap<CurrencyCode, CacheEntryId>,
}

impl InMemoryRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn collect_where<F>(&self, keep: F) -> Vec<ExchangeRateCacheEntry>
    where
        F: Fn(&ExchangeRateCacheEntry) -> bool,
    {
        let mut found: Vec<_> = self
            .entries
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by(|a, b| a.currency.cmp(&b.currency).then(a.date.cmp(&b.date)));
        found
    }
}

#[async_trait]
impl ExchangeRateCache for InMemoryRateCache {
    async fn find_latest(
        &self,
        currency: CurrencyCode,
    ) -> Result<Option<ExchangeRateCacheEntry>, RepoError> {
        let id = self.latest.get(&currency).map(|r| *r.value());
        Ok(id.and_then(|id| self.entries.get(&id).map(|e| e.value().clone())))
    }

    async fn find_for_date(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRateCacheEntry>, RepoError> {
        let id = CacheEntryId::for_rate(currency, date);
        Ok(self.entries.get(&id).map(|e| e.value().clone()))
    }

    async fn find_latest_for_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        Ok(self.collect_where(|e| e.is_latest && currencies.contains(&e.currency)))
    }

    async fn find_for_date_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
        date: NaiveDate,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        Ok(self.collect_where(|e| e.date == date && currencies.contains(&e.currency)))
    }

    async fn find_all_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        Ok(self.collect_where(|e| e.is_latest))
    }

    async fn find_all_non_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        Ok(self.collect_where(|e| !e.is_latest))
    }

    async fn save_all(
        &self,
        entries: Vec<ExchangeRateCacheEntry>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        let mut saved = Vec::with_capacity(entries.len());
        for entry in entries {
            let stored = match self.entries.entry(entry.id) {
                Entry::Occupied(mut slot) => {
                    let is_latest = slot.get().is_latest;
                    slot.insert(ExchangeRateCacheEntry { is_latest, ..entry });
                    slot.get().clone()
                }
                Entry::Vacant(slot) => slot.insert(entry.as_historical()).value().clone(),
            };
            saved.push(stored);
        }
        Ok(saved)
    }

    async fn swap_latest(
        &self,
        currency: CurrencyCode,
        expected: Option<CacheEntryId>,
        candidate: ExchangeRateCacheEntry,
    ) -> Result<ExchangeRateCacheEntry, RepoError> {
        let promoted = candidate.as_latest();

        match self.latest.entry(currency) {
            Entry::Occupied(mut slot) => {
                let current = *slot.get();
                if Some(current) != expected {
                    return Err(RepoError::Conflict(format!(
                        "latest {} for {} moved to {}",
                        expected.map_or_else(|| "none".to_string(), |id| id.to_string()),
                        currency,
                        current
                    )));
                }
                if current != promoted.id {
                    if let Some(mut old) = self.entries.get_mut(&current) {
                        old.is_latest = false;
                    }
                }
                self.entries.insert(promoted.id, promoted.clone());
                slot.insert(promoted.id);
            }
            Entry::Vacant(slot) => {
                if let Some(expected) = expected {
                    return Err(RepoError::Conflict(format!(
                        "latest {} for {} no longer exists",
                        expected, currency
                    )));
                }
                self.entries.insert(promoted.id, promoted.clone());
                slot.insert(promoted.id);
            }
        }

        Ok(promoted)
    }

    async fn delete_all(&self, entries: &[ExchangeRateCacheEntry]) -> Result<u64, RepoError> {
        let mut deleted = 0;
        for entry in entries {
            self.latest
                .remove_if(&entry.currency, |_, latest| *latest == entry.id);
            if self.entries.remove(&entry.id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn purge(&self) -> Result<u64, RepoError> {
        let deleted = self.entries.len() as u64;
        self.latest.clear();
        self.entries.clear();
        Ok(deleted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trail repository
// ─────────────────────────────────────────────────────────────────────────────

/// In-process append-only trail store.
#[derive(Default)]
pub struct InMemoryTrailRepository {
    records: DashMap<TrailId, TrailRecord>,
}

impl InMemoryTrailRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_where<F>(&self, page: PageRequest, keep: F) -> Page<TrailRecord>
    where
        F: Fn(&TrailRecord) -> bool,
    {
        let mut found: Vec<_> = self
            .records
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Page::slice(found, page)
    }
}

#[async_trait]
impl TrailRepository for InMemoryTrailRepository {
    async fn save(&self, record: TrailRecord) -> Result<TrailRecord, RepoError> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(RepoError::Conflict(format!(
                "trail {} already recorded",
                record.id
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(record).value().clone()),
        }
    }

    async fn find_by_id(&self, id: TrailId) -> Result<Option<TrailRecord>, RepoError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |_| true))
    }

    async fn find_by_date(
        &self,
        date: NaiveDate,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| r.date() == date))
    }

    async fn find_by_operation(
        &self,
        operation: TrailOperation,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| r.operation == operation))
    }

    async fn find_by_state(
        &self,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| r.state == state))
    }

    async fn find_by_date_and_operation(
        &self,
        date: NaiveDate,
        operation: TrailOperation,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| r.date() == date && r.operation == operation))
    }

    async fn find_by_date_and_state(
        &self,
        date: NaiveDate,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| r.date() == date && r.state == state))
    }

    async fn find_by_operation_and_state(
        &self,
        operation: TrailOperation,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| r.operation == operation && r.state == state))
    }

    async fn find_by_date_and_operation_and_state(
        &self,
        date: NaiveDate,
        operation: TrailOperation,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        Ok(self.page_where(page, |r| {
            r.date() == date && r.operation == operation && r.state == state
        }))
    }
}
