//! Fixed reference-table provider.
//!
//! Quotes every catalog currency against a chosen base using the reference USD
//! rates baked into [`CurrencyCode`]. Rates are dated "today" and a configurable
//! random variance can be applied per instance for realistic simulation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::Rng;

use rates_types::{
    CurrencyCode, CurrencyRate, CurrencyRateProvider, FixedDetails, ProviderDetails,
    ProviderError, ProviderType,
};

/// Provider backed by the in-process reference table.
#[derive(Debug, Clone)]
pub struct FixedRateProvider {
    name: String,
    base: CurrencyCode,
    max_variance_percent: f64,
}

impl FixedRateProvider {
    /// Creates a provider quoting against `base`, without fluctuation.
    pub fn new(name: impl Into<String>, base: CurrencyCode) -> Self {
        Self {
            name: name.into(),
            base,
            max_variance_percent: 0.0,
        }
    }

    /// Enables random rate fluctuation of up to `percent` in either direction.
    pub fn with_fluctuation(mut self, percent: f64) -> Self {
        self.max_variance_percent = percent.max(0.0);
        self
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn fluctuate(&self, base_rate: f64) -> f64 {
        if self.max_variance_percent == 0.0 {
            return base_rate;
        }
        let factor: f64 = rand::rng().random_range(-1.0..=1.0);
        base_rate + base_rate * (self.max_variance_percent / 100.0) * factor
    }

    /// Reference rate of `currency` in units of the base, or `None` past today.
    fn quote(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<CurrencyRate>, ProviderError> {
        if !currency.is_defined() {
            return Err(ProviderError::Unsupported(currency));
        }
        if date > Self::today() {
            return Ok(None);
        }

        let rate = if currency == self.base {
            1.0
        } else {
            self.fluctuate(currency.reference_usd_rate() / self.base.reference_usd_rate())
        };

        Ok(Some(CurrencyRate::new(currency, date, rate).with_details(
            ProviderDetails::Fixed(FixedDetails { base: self.base }),
        )))
    }

    fn quote_range(
        &self,
        currency: CurrencyCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        let to = to.min(Self::today());
        let mut rates = Vec::new();
        for date in from.iter_days().take_while(|d| *d <= to) {
            if let Some(rate) = self.quote(currency, date)? {
                rates.push(rate);
            }
        }
        Ok(rates)
    }
}

#[async_trait]
impl CurrencyRateProvider for FixedRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Fixed
    }

    async fn get_current_rate(
        &self,
        currency: CurrencyCode,
    ) -> Result<Option<CurrencyRate>, ProviderError> {
        self.quote(currency, Self::today())
    }

    async fn get_rate_for_date(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<CurrencyRate>, ProviderError> {
        self.quote(currency, date)
    }

    async fn get_rate_for_date_range(
        &self,
        currency: CurrencyCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        self.quote_range(currency, from, to)
    }

    async fn get_all_current_rates(&self) -> Result<Vec<CurrencyRate>, ProviderError> {
        self.get_all_rates_for_date(Self::today()).await
    }

    async fn get_all_rates_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        let mut rates = Vec::new();
        for &currency in CurrencyCode::all() {
            if let Some(rate) = self.quote(currency, date)? {
                rates.push(rate);
            }
        }
        Ok(rates)
    }

    async fn get_all_rates_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        let mut rates = Vec::new();
        for &currency in CurrencyCode::all() {
            rates.extend(self.quote_range(currency, from, to)?);
        }
        Ok(rates)
    }
}
