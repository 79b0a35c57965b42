//! Runtime settings shared by the services.

use std::time::Duration;

use rates_types::{ConfigError, CurrencyCode};

/// Ten years of daily rates.
pub const MAX_HISTORY_WINDOW_DAYS: u32 = 3660;

/// Knobs for provider selection, batching and reconciliation.
///
/// Built once at startup and handed to each service.
#[derive(Debug, Clone)]
pub struct RatesSettings {
    /// Registry name of the provider used by the workflows.
    pub default_provider: Option<String>,
    /// Currencies refreshed and back-filled on every run.
    pub tracked_currencies: Vec<CurrencyCode>,
    /// Upper bound on any single provider call.
    pub provider_timeout: Duration,
    /// How many days back `history_update` reaches.
    pub history_window_days: u32,
    /// Extra attempts after a latest-flag write conflict.
    pub reconcile_retries: u32,
    /// Currencies processed in parallel during a run.
    pub refresh_concurrency: usize,
}

impl Default for RatesSettings {
    fn default() -> Self {
        Self {
            default_provider: None,
            tracked_currencies: CurrencyCode::all().to_vec(),
            provider_timeout: Duration::from_secs(10),
            history_window_days: 30,
            reconcile_retries: 5,
            refresh_concurrency: 4,
        }
    }
}

impl RatesSettings {
    pub fn with_default_provider(mut self, name: impl Into<String>) -> Self {
        self.default_provider = Some(name.into());
        self
    }

    pub fn with_tracked_currencies(mut self, currencies: Vec<CurrencyCode>) -> Self {
        self.tracked_currencies = currencies;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_history_window_days(mut self, days: u32) -> Self {
        self.history_window_days = days;
        self
    }

    /// Rejects settings no run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracked_currencies.is_empty()
            || self.tracked_currencies.iter().any(|c| !c.is_defined())
        {
            return Err(ConfigError::InvalidValue("RATES_TRACKED_CURRENCIES"));
        }
        if self.provider_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("RATES_PROVIDER_TIMEOUT_SECS"));
        }
        if self.history_window_days > MAX_HISTORY_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue("RATES_HISTORY_WINDOW_DAYS"));
        }
        if self.refresh_concurrency == 0 {
            return Err(ConfigError::InvalidValue("RATES_REFRESH_CONCURRENCY"));
        }
        Ok(())
    }
}
