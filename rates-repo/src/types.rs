//! Database row structs and their domain conversions.

use sqlx::FromRow;

use rates_types::{
    CacheEntryId, CurrencyCode, ExchangeRateCacheEntry, ProviderType, RateLeg, RepoError,
    TrailFailure, TrailId, TrailRecord,
};

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(e.to_string())
}

/// Exchange rate cache row.
#[derive(FromRow)]
pub struct DbCacheEntry {
    pub id: String,
    pub currency: String,
    pub rate_date: String,
    pub from_currency: String,
    pub from_value: f64,
    pub to_currency: String,
    pub to_value: f64,
    pub provider: String,
    pub is_latest: bool,
}

impl DbCacheEntry {
    pub fn into_domain(self) -> Result<ExchangeRateCacheEntry, RepoError> {
        let id: CacheEntryId = self.id.parse().map_err(db_err)?;
        let date = chrono::NaiveDate::parse_from_str(&self.rate_date, "%Y-%m-%d").map_err(db_err)?;

        Ok(ExchangeRateCacheEntry {
            id,
            currency: CurrencyCode::from_code(&self.currency),
            from: RateLeg::new(CurrencyCode::from_code(&self.from_currency), self.from_value),
            to: RateLeg::new(CurrencyCode::from_code(&self.to_currency), self.to_value),
            date,
            provider: ProviderType::from_name(&self.provider),
            is_latest: self.is_latest,
        })
    }
}

/// Trail row.
#[derive(FromRow)]
pub struct DbTrail {
    pub id: String,
    pub operation: String,
    pub state: String,
    pub created_at: String,
    pub evaluated: i64,
    pub skipped: i64,
    pub affected_ids: String,
    pub failures: String,
}

impl DbTrail {
    pub fn into_domain(self) -> Result<TrailRecord, RepoError> {
        let id: TrailId = self.id.parse().map_err(db_err)?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(db_err)?
            .with_timezone(&chrono::Utc);
        let affected_ids: Vec<CacheEntryId> =
            serde_json::from_str(&self.affected_ids).map_err(db_err)?;
        let failures: Vec<TrailFailure> = serde_json::from_str(&self.failures).map_err(db_err)?;

        Ok(TrailRecord {
            id,
            operation: self.operation.parse().map_err(RepoError::Database)?,
            state: self.state.parse().map_err(RepoError::Database)?,
            timestamp,
            evaluated: self.evaluated.max(0) as u64,
            skipped: self.skipped.max(0) as u64,
            affected_ids,
            failures,
        })
    }
}

pub fn date_key(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
