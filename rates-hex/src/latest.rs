//! Latest-rate cache service.
//!
//! Reads the current latest entries and refreshes them from the default
//! provider. Every refresh ends with exactly one trail record and one
//! `LatestRatesUpdated` event, whatever happened to individual currencies.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use rates_types::{
    AppError, CurrencyCode, CurrencyRate, CurrencyRateProvider, ExchangeRateCache,
    ExchangeRateCacheEntry, FailureKind, SyncReport, TrailOperation, TrailRecord, TrailRepository,
};

use crate::events::{EventPublisher, LatestRatesUpdated};
use crate::failure::Skip;
use crate::reconcile::{Reconciled, Reconciler};
use crate::registry::{ProviderRegistry, call_with_timeout};
use crate::settings::RatesSettings;
use crate::trail::TrailService;

/// Application service for latest rates.
///
/// Generic over the cache and trail adapters, injected at compile time.
pub struct LatestRateService<C: ExchangeRateCache, T: TrailRepository> {
    cache: Arc<C>,
    registry: Arc<ProviderRegistry>,
    trails: TrailService<T>,
    reconciler: Reconciler<C>,
    events: EventPublisher,
    tracked: Vec<CurrencyCode>,
    concurrency: usize,
}

impl<C: ExchangeRateCache, T: TrailRepository> LatestRateService<C, T> {
    pub fn new(
        cache: Arc<C>,
        registry: Arc<ProviderRegistry>,
        trails: TrailService<T>,
        events: EventPublisher,
        settings: &RatesSettings,
    ) -> Self {
        let tracked: BTreeSet<_> = settings.tracked_currencies.iter().copied().collect();
        Self {
            reconciler: Reconciler::new(cache.clone(), settings.reconcile_retries),
            cache,
            registry,
            trails,
            events,
            tracked: tracked.into_iter().collect(),
            concurrency: settings.refresh_concurrency.max(1),
        }
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────────

    /// All latest entries, one per currency.
    pub async fn get_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, AppError> {
        self.cache.find_all_latest().await.map_err(Into::into)
    }

    pub async fn get_latest_for(
        &self,
        currency: CurrencyCode,
    ) -> Result<ExchangeRateCacheEntry, AppError> {
        if !currency.is_defined() {
            return Err(AppError::BadRequest("Unknown currency".into()));
        }

        self.cache
            .find_latest(currency)
            .await
            .map_err(Into::into)
            .and_then(|opt| {
                opt.ok_or_else(|| AppError::NotFound(format!("Latest rate for {}", currency)))
            })
    }

    pub async fn get_latest_for_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, AppError> {
        self.cache
            .find_latest_for_many(currencies)
            .await
            .map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────────

    /// Pulls the current rate of every tracked currency and reconciles it.
    ///
    /// A failing currency is skipped and noted; the run itself only fails when
    /// the trail cannot be written.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<TrailRecord, AppError> {
        let provider = self.registry.default_provider();
        tracing::info!(
            provider = provider.name(),
            currencies = self.tracked.len(),
            "Refreshing latest rates"
        );

        let calls: Vec<_> = self
            .tracked
            .iter()
            .map(|&currency| {
                let provider = provider.clone();
                async move {
                    let outcome = self.refresh_one(provider.as_ref(), currency).await;
                    (currency, outcome)
                }
            })
            .collect();

        let mut outcomes: Vec<_> = stream::iter(calls)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(currency, _)| *currency);

        let mut report = SyncReport::new();
        let mut moved = Vec::new();
        for (currency, outcome) in outcomes {
            match outcome {
                Ok(reconciled) => {
                    if reconciled.is_promoted() {
                        moved.push(currency);
                    }
                    report.record_success(reconciled.id());
                }
                Err(skip) => {
                    tracing::warn!(%currency, kind = %skip.kind, reason = %skip.message, "Currency skipped");
                    report.record_skip(currency, skip.kind, skip.message);
                }
            }
        }

        let record = self
            .trails
            .save_report(TrailOperation::LatestSynchronization, report)
            .await?;

        self.events.publish(LatestRatesUpdated {
            trail_id: record.id,
            currencies: moved,
            affected_ids: record.affected_ids.clone(),
            published_at: Utc::now(),
        });

        Ok(record)
    }

    async fn refresh_one(
        &self,
        provider: &dyn CurrencyRateProvider,
        currency: CurrencyCode,
    ) -> Result<Reconciled, Skip> {
        let rate = call_with_timeout(self.registry.timeout(), provider.get_current_rate(currency))
            .await?
            .ok_or_else(|| {
                Skip::new(
                    FailureKind::Missing,
                    format!("{} has no current rate for {}", provider.name(), currency),
                )
            })?;

        if rate.currency() != currency {
            return Err(Skip::new(
                FailureKind::Validation,
                format!("asked for {}, got {}", currency, rate.currency()),
            ));
        }

        let candidate = ExchangeRateCacheEntry::from_rate(&rate, provider.provider_type())?;
        Ok(self.reconciler.reconcile(candidate).await?)
    }

    /// Stores one externally supplied rate through the same reconciliation.
    ///
    /// The rate's first provider details decide the entry's provider. A rate
    /// with no details is checked against the default provider and rejected
    /// as a validation failure, since nothing says what it is quoted against.
    /// Writes a `CREATE_OR_UPDATE` trail whether or not the rate was accepted.
    #[tracing::instrument(skip(self, rate), fields(currency = %rate.currency(), date = %rate.date()))]
    pub async fn create_or_update(
        &self,
        rate: CurrencyRate,
    ) -> Result<ExchangeRateCacheEntry, AppError> {
        let provider = rate
            .details()
            .keys()
            .next()
            .copied()
            .unwrap_or_else(|| self.registry.default_provider().provider_type());

        let outcome = match ExchangeRateCacheEntry::from_rate(&rate, provider) {
            Ok(candidate) => self.reconciler.reconcile(candidate).await.map_err(Skip::from),
            Err(e) => Err(Skip::from(e)),
        };

        let mut report = SyncReport::new();
        match &outcome {
            Ok(reconciled) => report.record_success(reconciled.id()),
            Err(skip) => report.record_skip(rate.currency(), skip.kind, skip.message.clone()),
        }
        let record = self
            .trails
            .save_report(TrailOperation::CreateOrUpdate, report)
            .await?;

        match outcome {
            Ok(reconciled) => {
                if reconciled.is_promoted() {
                    self.events.publish(LatestRatesUpdated {
                        trail_id: record.id,
                        currencies: vec![reconciled.entry().currency],
                        affected_ids: vec![reconciled.id()],
                        published_at: Utc::now(),
                    });
                }
                Ok(reconciled.entry().clone())
            }
            Err(skip) if skip.kind == FailureKind::Validation => {
                Err(AppError::BadRequest(skip.message))
            }
            Err(skip) => Err(AppError::Internal(skip.message)),
        }
    }

    /// Drops every cached entry, latest and historical.
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self) -> Result<u64, AppError> {
        let deleted = self.cache.purge().await?;
        tracing::info!(deleted, "Exchange rate cache purged");
        Ok(deleted)
    }
}
