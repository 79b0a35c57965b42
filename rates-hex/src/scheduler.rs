//! Periodic refresh and history runs.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument};

use rates_types::{ExchangeRateCache, TrailRepository};

use crate::history::HistoricalSyncService;
use crate::latest::LatestRateService;

/// Drives `refresh` and `history_update` on fixed intervals.
///
/// A `None` interval disables that loop. Each loop runs once immediately.
pub struct SyncScheduler<C: ExchangeRateCache, T: TrailRepository> {
    latest: Arc<LatestRateService<C, T>>,
    history: Arc<HistoricalSyncService<C, T>>,
    refresh_every: Option<Duration>,
    history_every: Option<Duration>,
}

impl<C: ExchangeRateCache, T: TrailRepository> SyncScheduler<C, T> {
    pub fn new(
        latest: Arc<LatestRateService<C, T>>,
        history: Arc<HistoricalSyncService<C, T>>,
        refresh_every: Option<Duration>,
        history_every: Option<Duration>,
    ) -> Self {
        Self {
            latest,
            history,
            refresh_every: refresh_every.filter(|d| !d.is_zero()),
            history_every: history_every.filter(|d| !d.is_zero()),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!(
            refresh_every = ?self.refresh_every,
            history_every = ?self.history_every,
            "Starting sync scheduler"
        );

        let latest = self.latest;
        let history = self.history;

        let refresh_loop = async {
            let Some(every) = self.refresh_every else {
                return;
            };
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = latest.refresh().await {
                    error!("Scheduled refresh failed: {}", e);
                }
            }
        };

        let history_loop = async {
            let Some(every) = self.history_every else {
                return;
            };
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = history.history_update().await {
                    error!("Scheduled history update failed: {}", e);
                }
            }
        };

        tokio::join!(refresh_loop, history_loop);
    }
}
