//! Latest-flag reconciliation.
//!
//! Writes for one currency are serialized by an in-process lock, and every
//! promotion goes through the cache's compare-and-swap `swap_latest`, so a
//! writer in another process loses with `Conflict` instead of leaving two
//! latest rows behind.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;

use rates_types::{CacheEntryId, CurrencyCode, ExchangeRateCache, ExchangeRateCacheEntry, RepoError};

const BACKOFF_BASE_MS: u64 = 10;
const BACKOFF_CAP_MS: u64 = 500;

/// Where a reconciled candidate ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Stored and flagged latest.
    Promoted(ExchangeRateCacheEntry),
    /// Stored as history; a newer latest already existed.
    Historical(ExchangeRateCacheEntry),
}

impl Reconciled {
    pub fn entry(&self) -> &ExchangeRateCacheEntry {
        match self {
            Reconciled::Promoted(e) | Reconciled::Historical(e) => e,
        }
    }

    pub fn id(&self) -> CacheEntryId {
        self.entry().id
    }

    pub fn is_promoted(&self) -> bool {
        matches!(self, Reconciled::Promoted(_))
    }
}

/// Applies candidates to the cache without ever regressing the latest pointer.
pub struct Reconciler<C: ExchangeRateCache> {
    cache: Arc<C>,
    locks: DashMap<CurrencyCode, Arc<Mutex<()>>>,
    retries: u32,
}

impl<C: ExchangeRateCache> Reconciler<C> {
    pub fn new(cache: Arc<C>, retries: u32) -> Self {
        Self {
            cache,
            locks: DashMap::new(),
            retries,
        }
    }

    fn lock_for(&self, currency: CurrencyCode) -> Arc<Mutex<()>> {
        self.locks.entry(currency).or_default().clone()
    }

    /// Stores `candidate`, promoting it when it is at least as new as the
    /// current latest. Conflicts are retried with jittered backoff.
    #[tracing::instrument(skip(self, candidate), fields(currency = %candidate.currency, date = %candidate.date))]
    pub async fn reconcile(
        &self,
        candidate: ExchangeRateCacheEntry,
    ) -> Result<Reconciled, RepoError> {
        let lock = self.lock_for(candidate.currency);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            match self.apply(&candidate).await {
                Err(RepoError::Conflict(reason)) if attempt < self.retries => {
                    attempt += 1;
                    let delay = backoff(attempt);
                    tracing::debug!(attempt, ?delay, %reason, "Latest write conflicted, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn apply(&self, candidate: &ExchangeRateCacheEntry) -> Result<Reconciled, RepoError> {
        let current = self.cache.find_latest(candidate.currency).await?;

        match current {
            Some(current) if current.date > candidate.date => {
                let mut saved = self
                    .cache
                    .save_all(vec![candidate.clone().as_historical()])
                    .await?;
                saved
                    .pop()
                    .map(Reconciled::Historical)
                    .ok_or_else(|| RepoError::Database("historical write returned no row".into()))
            }
            current => {
                let expected = current.map(|c| c.id);
                self.cache
                    .swap_latest(candidate.currency, expected, candidate.clone())
                    .await
                    .map(Reconciled::Promoted)
            }
        }
    }
}

/// Jittered exponential delay before retry `attempt` (1-based).
pub(crate) fn backoff(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE_MS.saturating_mul(1 << attempt.min(6));
    let jitter = rand::rng().random_range(0..=BACKOFF_BASE_MS);
    Duration::from_millis(exp.min(BACKOFF_CAP_MS) + jitter)
}
