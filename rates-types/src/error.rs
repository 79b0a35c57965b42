//! Error types for the exchange-rate engine.

use crate::domain::{CurrencyCode, ProviderType};

/// Domain-level errors (rates that cannot be materialized).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Currency is not in the catalog")]
    UndefinedCurrency,

    #[error("Invalid rate for {currency}: {rate}")]
    InvalidRate { currency: CurrencyCode, rate: f64 },

    #[error("Rate for {currency} carries no {provider} details")]
    MissingDetails {
        currency: CurrencyCode,
        provider: ProviderType,
    },
}

/// Repository-level errors (cache and trail stores).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Entity not found")]
    NotFound,
}

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No rate provider is registered")]
    NoProviders,

    #[error("Unknown rate provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Internal(e),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
