//! Provider-sourced currency rate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::currency::CurrencyCode;
use super::provider::{ProviderDetails, ProviderType};
use crate::error::DomainError;

/// A single quote returned by a provider.
///
/// Rates are immutable once built: providers create a fresh value per fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    currency: CurrencyCode,
    date: NaiveDate,
    #[serde(default)]
    rate: f64,
    #[serde(default)]
    details: BTreeMap<ProviderType, ProviderDetails>,
}

impl CurrencyRate {
    pub fn new(currency: CurrencyCode, date: NaiveDate, rate: f64) -> Self {
        Self {
            currency,
            date,
            rate,
            details: BTreeMap::new(),
        }
    }

    /// Attaches provider details, keyed by the provider that produced them.
    pub fn with_details(mut self, details: ProviderDetails) -> Self {
        self.details.insert(details.provider_type(), details);
        self
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn details(&self) -> &BTreeMap<ProviderType, ProviderDetails> {
        &self.details
    }

    pub fn details_for(&self, provider: ProviderType) -> Option<&ProviderDetails> {
        self.details.get(&provider)
    }

    /// Checks that the rate can be materialized.
    ///
    /// # Validation
    /// - Currency must be in the catalog
    /// - Rate must be finite and strictly positive
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.currency.is_defined() {
            return Err(DomainError::UndefinedCurrency);
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(DomainError::InvalidRate {
                currency: self.currency,
                rate: self.rate,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::FixedDetails;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_missing_rate_defaults_to_zero() {
        let rate: CurrencyRate =
            serde_json::from_str(r#"{"currency":"EUR","date":"2024-01-10"}"#).unwrap();
        assert_eq!(rate.rate(), 0.0);
        assert!(rate.details().is_empty());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(CurrencyRate::new(CurrencyCode::EUR, day(1), 4.3).validate().is_ok());

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = CurrencyRate::new(CurrencyCode::EUR, day(1), bad).validate();
            assert!(matches!(result, Err(DomainError::InvalidRate { .. })));
        }

        let undefined = CurrencyRate::new(CurrencyCode::Undefined, day(1), 1.0).validate();
        assert!(matches!(undefined, Err(DomainError::UndefinedCurrency)));
    }

    #[test]
    fn test_details_keyed_by_provider() {
        let rate = CurrencyRate::new(CurrencyCode::EUR, day(1), 1.08).with_details(
            ProviderDetails::Fixed(FixedDetails {
                base: CurrencyCode::USD,
            }),
        );
        assert!(rate.details_for(ProviderType::Fixed).is_some());
        assert!(rate.details_for(ProviderType::Nbp).is_none());
    }
}
