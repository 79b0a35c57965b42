//! National Bank of Poland (NBP) table A provider.
//!
//! Talks to the public JSON API at `https://api.nbp.pl`. Rates are mid rates
//! quoted in PLN. The API answers 404 when no table was published for the
//! requested day (weekends, holidays) and caps date ranges at 93 days, so
//! longer ranges are split into consecutive requests.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use rates_types::{
    CurrencyCode, CurrencyRate, CurrencyRateProvider, NbpDetails, ProviderDetails, ProviderError,
    ProviderType,
};

pub const DEFAULT_BASE_URL: &str = "https://api.nbp.pl";

/// Longest range the API serves in a single request.
pub const MAX_RANGE_DAYS: u64 = 93;

const TABLE: &str = "A";

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RateSeries {
    table: String,
    code: String,
    rates: Vec<SeriesRate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeriesRate {
    no: String,
    effective_date: NaiveDate,
    mid: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateTable {
    table: String,
    no: String,
    effective_date: NaiveDate,
    rates: Vec<TableRate>,
}

#[derive(Debug, Deserialize)]
struct TableRate {
    code: String,
    mid: Option<f64>,
}

fn nbp_rate(code: &str, date: NaiveDate, mid: Option<f64>, table: &str, no: &str) -> CurrencyRate {
    CurrencyRate::new(CurrencyCode::from_code(code), date, mid.unwrap_or_default()).with_details(
        ProviderDetails::Nbp(NbpDetails {
            table: table.to_string(),
            number: no.to_string(),
        }),
    )
}

/// Parses a single-currency series (`/api/exchangerates/rates/...`).
pub fn parse_rate_series(body: &str) -> Result<Vec<CurrencyRate>, ProviderError> {
    let series: RateSeries =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(series
        .rates
        .iter()
        .map(|r| nbp_rate(&series.code, r.effective_date, r.mid, &series.table, &r.no))
        .collect())
}

/// Parses a list of full tables (`/api/exchangerates/tables/...`).
///
/// Codes outside the catalog come back as `CurrencyCode::Undefined`.
pub fn parse_tables(body: &str) -> Result<Vec<CurrencyRate>, ProviderError> {
    let tables: Vec<RateTable> =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    Ok(tables
        .iter()
        .flat_map(|t| {
            t.rates
                .iter()
                .map(move |r| nbp_rate(&r.code, t.effective_date, r.mid, &t.table, &t.no))
        })
        .collect())
}

/// Splits `[from, to]` into consecutive inclusive windows of at most `max_days`.
pub fn split_range(from: NaiveDate, to: NaiveDate, max_days: u64) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start
            .checked_add_days(Days::new(max_days.max(1) - 1))
            .map_or(to, |d| d.min(to));
        windows.push((start, end));
        match end.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }
    windows
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the NBP API.
pub struct NbpProvider {
    name: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl NbpProvider {
    /// Creates a provider; every request is bounded by `timeout`.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Communication(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    fn supports(currency: CurrencyCode) -> Result<(), ProviderError> {
        if currency.is_defined() && currency != CurrencyCode::PLN {
            Ok(())
        } else {
            Err(ProviderError::Unsupported(currency))
        }
    }

    /// GETs `path`, returning `None` on 404.
    async fn fetch(&self, path: &str) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/api/exchangerates/{}?format=json", self.base_url, path);
        tracing::debug!(%url, "NBP request");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else {
                ProviderError::Communication(e.to_string())
            }
        })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp
                .text()
                .await
                .map(Some)
                .map_err(|e| ProviderError::Communication(e.to_string())),
            status => Err(ProviderError::Communication(format!("HTTP {}", status))),
        }
    }

    async fn series(&self, path: String) -> Result<Vec<CurrencyRate>, ProviderError> {
        match self.fetch(&path).await? {
            Some(body) => parse_rate_series(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn tables(&self, path: String) -> Result<Vec<CurrencyRate>, ProviderError> {
        match self.fetch(&path).await? {
            Some(body) => parse_tables(&body),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for NbpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Nbp
    }

    async fn get_current_rate(
        &self,
        currency: CurrencyCode,
    ) -> Result<Option<CurrencyRate>, ProviderError> {
        Self::supports(currency)?;
        let path = format!("rates/{}/{}/", TABLE, currency.code());
        Ok(self.series(path).await?.into_iter().last())
    }

    async fn get_rate_for_date(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<CurrencyRate>, ProviderError> {
        Self::supports(currency)?;
        let path = format!("rates/{}/{}/{}/", TABLE, currency.code(), day(date));
        Ok(self.series(path).await?.into_iter().next())
    }

    async fn get_rate_for_date_range(
        &self,
        currency: CurrencyCode,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        Self::supports(currency)?;
        let mut rates = Vec::new();
        for (start, end) in split_range(from, to, MAX_RANGE_DAYS) {
            let path = format!(
                "rates/{}/{}/{}/{}/",
                TABLE,
                currency.code(),
                day(start),
                day(end)
            );
            rates.extend(self.series(path).await?);
        }
        Ok(rates)
    }

    async fn get_all_current_rates(&self) -> Result<Vec<CurrencyRate>, ProviderError> {
        self.tables(format!("tables/{}/", TABLE)).await
    }

    async fn get_all_rates_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        self.tables(format!("tables/{}/{}/", TABLE, day(date))).await
    }

    async fn get_all_rates_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CurrencyRate>, ProviderError> {
        let mut rates = Vec::new();
        for (start, end) in split_range(from, to, MAX_RANGE_DAYS) {
            let path = format!("tables/{}/{}/{}/", TABLE, day(start), day(end));
            rates.extend(self.tables(path).await?);
        }
        Ok(rates)
    }
}
