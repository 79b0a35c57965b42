//! # Rates Client SDK
//!
//! A typed Rust client for the exchange-rate management API.

use rates_types::{
    CurrencyCode, CurrencyRate, ExchangeRateCacheEntry, Page, PurgeResponse, TrailId, TrailQuery,
    TrailRecord,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Exchange-rate API client.
pub struct RatesClient {
    base_url: String,
    http: Client,
}

impl RatesClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    /// Asks the server to start a latest-rate refresh.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.trigger("/api/exchange-rates/refresh").await
    }

    /// Asks the server to start a historical update.
    pub async fn history_update(&self) -> Result<(), ClientError> {
        self.trigger("/api/exchange-rates/history-update").await
    }

    /// Lists latest entries, optionally restricted to `currencies`.
    pub async fn latest(
        &self,
        currencies: &[CurrencyCode],
    ) -> Result<Vec<ExchangeRateCacheEntry>, ClientError> {
        let mut req = self.http.get(self.url("/api/exchange-rates/latest"));
        if !currencies.is_empty() {
            let filter = currencies
                .iter()
                .map(CurrencyCode::code)
                .collect::<Vec<_>>()
                .join(",");
            req = req.query(&[("currencies", filter)]);
        }
        self.send(req).await
    }

    /// Gets the latest entry for one currency.
    pub async fn latest_for(
        &self,
        currency: CurrencyCode,
    ) -> Result<ExchangeRateCacheEntry, ClientError> {
        let req = self
            .http
            .get(self.url(&format!("/api/exchange-rates/latest/{}", currency.code())));
        self.send(req).await
    }

    /// Manually creates or updates one rate.
    pub async fn create_or_update(
        &self,
        rate: &CurrencyRate,
    ) -> Result<ExchangeRateCacheEntry, ClientError> {
        let req = self.http.put(self.url("/api/exchange-rates")).json(rate);
        self.send(req).await
    }

    /// Deletes every cached entry.
    pub async fn purge(&self) -> Result<u64, ClientError> {
        let req = self.http.delete(self.url("/api/exchange-rates"));
        let resp: PurgeResponse = self.send(req).await?;
        Ok(resp.deleted)
    }

    /// Lists trail records matching `query`, newest first.
    pub async fn trails(&self, query: &TrailQuery) -> Result<Page<TrailRecord>, ClientError> {
        let req = self.http.get(self.url("/api/trails")).query(query);
        self.send(req).await
    }

    /// Gets one trail record.
    pub async fn trail(&self, id: TrailId) -> Result<TrailRecord, ClientError> {
        let req = self.http.get(self.url(&format!("/api/trails/{}", id)));
        self.send(req).await
    }

    async fn trigger(&self, path: &str) -> Result<(), ClientError> {
        let resp = self.http.post(self.url(path)).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(resp).await)
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::api_error(resp).await)
        }
    }

    async fn api_error(resp: reqwest::Response) -> ClientError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RatesClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = RatesClient::new("http://localhost:3000/");
        assert_eq!(client.url("/health"), "http://localhost:3000/health");
    }
}
