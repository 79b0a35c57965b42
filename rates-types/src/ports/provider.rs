//! Currency rate provider port.
//!
//! This trait defines the interface for external rate sources.
//! Implementations can be HTTP clients, fixed tables, mock providers, etc.

use std::time::Duration;

use chrono::NaiveDate;

use crate::domain::{CurrencyCode, CurrencyRate, FailureKind, ProviderType};

/// Error type for provider calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider unreachable: {0}")]
    Communication(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed provider payload: {0}")]
    Parse(String),

    #[error("Unsupported currency: {0}")]
    Unsupported(CurrencyCode),
}

impl ProviderError {
    /// Transport failures are worth retrying; payload failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Communication(_) | ProviderError::Timeout(_)
        )
    }

    /// How the failure is recorded on the trail.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ProviderError::Communication(_) => FailureKind::Communication,
            ProviderError::Timeout(_) => FailureKind::Timeout,
            ProviderError::Parse(_) => FailureKind::Parse,
            ProviderError::Unsupported(_) => FailureKind::Unsupported,
        }
    }
}

/// Port trait for currency rate providers.
///
/// Every returned rate carries the provider's own details, which name the
/// currency the rate is quoted against.
#[async_trait::async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Registration name, unique within a registry.
    fn name(&self) -> &str;

    fn provider_type(&self) -> ProviderType;

    async fn get_current_rate(
        &self,
        currency: CurrencyCode,
    ) -> Result<Option<CurrencyRate>, ProviderError>;

    async fn get_rate_for_date(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<CurrencyRate>, ProviderError>;

    async fn get_rate_for_date_range(
        &self,
        currency: CurrencyCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError>;

    async fn get_all_current_rates(&self) -> Result<Vec<CurrencyRate>, ProviderError>;

    async fn get_all_rates_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError>;

    async fn get_all_rates_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError>;
}
