//! Historical synchronization.
//!
//! Back-fills a trailing window of daily rates. Entries are written through
//! `save_all` only, so this path never touches the latest pointer, and the
//! stable per-(currency, date) ids make repeated runs overwrite instead of
//! duplicate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use futures::stream::{self, StreamExt};

use rates_types::{
    AppError, CacheEntryId, CurrencyCode, CurrencyRate, CurrencyRateProvider, ExchangeRateCache,
    ExchangeRateCacheEntry, FailureKind, ProviderError, RepoError, SyncReport, TrailOperation,
    TrailRecord, TrailRepository, TrailState,
};

use crate::failure::Skip;
use crate::reconcile::backoff;
use crate::registry::{ProviderRegistry, call_with_timeout};
use crate::settings::{MAX_HISTORY_WINDOW_DAYS, RatesSettings};
use crate::trail::TrailService;

/// Application service for historical back-fill.
pub struct HistoricalSyncService<C: ExchangeRateCache, T: TrailRepository> {
    cache: Arc<C>,
    registry: Arc<ProviderRegistry>,
    trails: TrailService<T>,
    tracked: Vec<CurrencyCode>,
    window_days: u32,
    concurrency: usize,
    retries: u32,
}

impl<C: ExchangeRateCache, T: TrailRepository> HistoricalSyncService<C, T> {
    pub fn new(
        cache: Arc<C>,
        registry: Arc<ProviderRegistry>,
        trails: TrailService<T>,
        settings: &RatesSettings,
    ) -> Self {
        let mut tracked = settings.tracked_currencies.clone();
        tracked.sort();
        tracked.dedup();
        Self {
            cache,
            registry,
            trails,
            tracked,
            window_days: settings.history_window_days.min(MAX_HISTORY_WINDOW_DAYS),
            concurrency: settings.refresh_concurrency.max(1),
            retries: settings.reconcile_retries,
        }
    }

    /// First and last day covered by a run started on `today`.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let from = today
            .checked_sub_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MIN);
        (from, today)
    }

    /// Fetches the window for every tracked currency and stores it as history.
    ///
    /// Evaluated counts the rates the provider returned; skipped counts rates
    /// rejected by validation, currencies whose fetch failed and entries whose
    /// write failed. Each currency is written on its own, so one failing write
    /// never costs another currency its entries. The run is an error when
    /// nothing was stored.
    #[tracing::instrument(skip(self))]
    pub async fn history_update(&self) -> Result<TrailRecord, AppError> {
        let provider = self.registry.default_provider();
        let (from, to) = self.window(Utc::now().date_naive());
        tracing::info!(provider = provider.name(), %from, %to, "Starting historical update");

        let calls: Vec<_> = self
            .tracked
            .iter()
            .map(|&currency| {
                let provider = provider.clone();
                async move {
                    let rates = self.fetch(provider.as_ref(), currency, from, to).await;
                    (currency, rates)
                }
            })
            .collect();

        let mut fetched: Vec<_> = stream::iter(calls)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        fetched.sort_by_key(|(currency, _)| *currency);

        let mut report = SyncReport::new();
        for (currency, result) in fetched {
            let rates = match result {
                Ok(rates) => rates,
                Err(e) => {
                    tracing::warn!(%currency, error = %e, "History fetch failed");
                    report.record_skip(currency, e.failure_kind(), e.to_string());
                    continue;
                }
            };

            report.evaluated += rates.len() as u64;
            let mut batch: BTreeMap<CacheEntryId, ExchangeRateCacheEntry> = BTreeMap::new();
            for rate in rates {
                if rate.currency() != currency {
                    report.record_skip(
                        currency,
                        FailureKind::Validation,
                        format!("asked for {}, got {}", currency, rate.currency()),
                    );
                    continue;
                }
                match ExchangeRateCacheEntry::from_rate(&rate, provider.provider_type()) {
                    Ok(entry) => {
                        batch.insert(entry.id, entry.as_historical());
                    }
                    Err(e) => {
                        tracing::debug!(%currency, date = %rate.date(), error = %e, "Rate dropped");
                        report.record_skip(currency, FailureKind::Validation, e.to_string());
                    }
                }
            }

            if batch.is_empty() {
                continue;
            }
            let size = batch.len();
            match self.store(batch.into_values().collect()).await {
                Ok(saved) => report.affected_ids.extend(saved.iter().map(|e| e.id)),
                Err(e) => {
                    tracing::error!(%currency, error = %e, "History write failed");
                    let skip = Skip::from(e);
                    for _ in 0..size {
                        report.record_skip(currency, skip.kind, skip.message.clone());
                    }
                }
            }
        }

        let mut record = TrailRecord::from_report(TrailOperation::HistoricalUpdate, report);
        if record.affected_ids.is_empty() {
            record.state = TrailState::Error;
        }
        self.trails.save_record(record).await
    }

    /// Writes one currency's entries, retrying conflicts with backoff.
    async fn store(
        &self,
        batch: Vec<ExchangeRateCacheEntry>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        let mut attempt = 0;
        loop {
            match self.cache.save_all(batch.clone()).await {
                Err(RepoError::Conflict(reason)) if attempt < self.retries => {
                    attempt += 1;
                    let delay = backoff(attempt);
                    tracing::debug!(attempt, ?delay, %reason, "History write conflicted, retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn fetch(
        &self,
        provider: &dyn CurrencyRateProvider,
        currency: CurrencyCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        call_with_timeout(
            self.registry.timeout(),
            provider.get_rate_for_date_range(currency, from, to),
        )
        .await
    }
}
