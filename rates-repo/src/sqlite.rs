//! SQLite cache and trail adapters.
//!
//! The latest-flag invariant is enforced twice: `swap_latest` checks the
//! expected latest id inside a transaction, and a partial unique index rejects a
//! second `is_latest = 1` row per currency.
#![allow(clippy::collapsible_if)]

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveDate, SecondsFormat};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use rates_types::{
    CacheEntryId, CurrencyCode, ExchangeRateCache, ExchangeRateCacheEntry, Page, PageRequest,
    RepoError, TrailId, TrailOperation, TrailRecord, TrailRepository, TrailState,
};

use crate::types::{DbCacheEntry, DbTrail, date_key};

const CACHE_COLUMNS: &str = "id, currency, rate_date, from_currency, from_value, to_currency, to_value, provider, is_latest";

const TRAIL_COLUMNS: &str =
    "id, operation, state, created_at, evaluated, skipped, affected_ids, failures";

const UPSERT_ENTRY: &str = r#"
    INSERT INTO exchange_rate_cache
        (id, currency, rate_date, from_currency, from_value, to_currency, to_value, provider, is_latest)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET
        from_currency = excluded.from_currency,
        from_value = excluded.from_value,
        to_currency = excluded.to_currency,
        to_value = excluded.to_value,
        provider = excluded.provider
"#;

fn db_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(e.to_string())
}

/// Maps write failures, turning lost races into conflicts.
fn write_err(e: sqlx::Error) -> RepoError {
    if let Some(db) = e.as_database_error() {
        let busy = matches!(db.code().as_deref(), Some("5") | Some("6"));
        if db.is_unique_violation() || busy {
            return RepoError::Conflict(db.message().to_string());
        }
    }
    db_err(e)
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

/// Opens (creating if needed) a SQLite database and runs the migrations.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");

    // Ensure on-disk SQLite target directory exists (no-op for in-memory).
    if let Some(path) = database_url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if !in_memory {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    // Every in-memory connection is its own database, so keep exactly one.
    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Creates the schema on an existing pool.
pub async fn migrate(pool: &SqlitePool) -> Result<(), RepoError> {
    sqlx::raw_sql(include_str!("../migrations/0001_create_exchange_rate_cache.sql"))
        .execute(pool)
        .await
        .map_err(db_err)?;
    sqlx::raw_sql(include_str!("../migrations/0002_create_trails.sql"))
        .execute(pool)
        .await
        .map_err(db_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Exchange rate cache
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed exchange rate cache.
#[derive(Clone)]
pub struct SqliteRateCache {
    pool: SqlitePool,
}

impl SqliteRateCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        clause: &str,
        currencies: Option<&BTreeSet<CurrencyCode>>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM exchange_rate_cache WHERE {}",
            CACHE_COLUMNS, clause
        ));

        if let Some(currencies) = currencies {
            if currencies.is_empty() {
                return Ok(Vec::new());
            }
            qb.push(" AND currency IN (");
            let mut separated = qb.separated(", ");
            for currency in currencies {
                separated.push_bind(currency.code());
            }
            separated.push_unseparated(")");
        }
        if let Some(date) = date {
            qb.push(" AND rate_date = ").push_bind(date_key(date));
        }
        qb.push(" ORDER BY currency, rate_date");

        let rows: Vec<DbCacheEntry> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter().map(DbCacheEntry::into_domain).collect()
    }

    async fn fetch_one(
        &self,
        executor: impl sqlx::SqliteExecutor<'_>,
        id: CacheEntryId,
    ) -> Result<ExchangeRateCacheEntry, RepoError> {
        let row: DbCacheEntry = sqlx::query_as(&format!(
            "SELECT {} FROM exchange_rate_cache WHERE id = ?",
            CACHE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_one(executor)
        .await
        .map_err(db_err)?;
        row.into_domain()
    }
}

fn bind_entry<'q>(
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    entry: &ExchangeRateCacheEntry,
    is_latest: bool,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(entry.id.to_string())
        .bind(entry.currency.code())
        .bind(date_key(entry.date))
        .bind(entry.from.currency.code())
        .bind(entry.from.value)
        .bind(entry.to.currency.code())
        .bind(entry.to.value)
        .bind(entry.provider.name())
        .bind(is_latest)
}

#[async_trait]
impl ExchangeRateCache for SqliteRateCache {
    async fn find_latest(
        &self,
        currency: CurrencyCode,
    ) -> Result<Option<ExchangeRateCacheEntry>, RepoError> {
        let row: Option<DbCacheEntry> = sqlx::query_as(&format!(
            "SELECT {} FROM exchange_rate_cache WHERE currency = ? AND is_latest = 1",
            CACHE_COLUMNS
        ))
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbCacheEntry::into_domain).transpose()
    }

    async fn find_for_date(
        &self,
        currency: CurrencyCode,
        date: NaiveDate,
    ) -> Result<Option<ExchangeRateCacheEntry>, RepoError> {
        let row: Option<DbCacheEntry> = sqlx::query_as(&format!(
            "SELECT {} FROM exchange_rate_cache WHERE currency = ? AND rate_date = ?",
            CACHE_COLUMNS
        ))
        .bind(currency.code())
        .bind(date_key(date))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbCacheEntry::into_domain).transpose()
    }

    async fn find_latest_for_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        self.fetch_where("is_latest = 1", Some(currencies), None).await
    }

    async fn find_for_date_many(
        &self,
        currencies: &BTreeSet<CurrencyCode>,
        date: NaiveDate,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        self.fetch_where("1 = 1", Some(currencies), Some(date)).await
    }

    async fn find_all_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        self.fetch_where("is_latest = 1", None, None).await
    }

    async fn find_all_non_latest(&self) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        self.fetch_where("is_latest = 0", None, None).await
    }

    async fn save_all(
        &self,
        entries: Vec<ExchangeRateCacheEntry>,
    ) -> Result<Vec<ExchangeRateCacheEntry>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let mut saved = Vec::with_capacity(entries.len());
        for entry in &entries {
            bind_entry(sqlx::query(UPSERT_ENTRY), entry, false)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;
            saved.push(self.fetch_one(&mut *tx, entry.id).await?);
        }

        tx.commit().await.map_err(write_err)?;
        Ok(saved)
    }

    async fn swap_latest(
        &self,
        currency: CurrencyCode,
        expected: Option<CacheEntryId>,
        candidate: ExchangeRateCacheEntry,
    ) -> Result<ExchangeRateCacheEntry, RepoError> {
        let mut tx = self.pool.begin().await.map_err(write_err)?;

        let current: Option<String> = sqlx::query_scalar(
            "SELECT id FROM exchange_rate_cache WHERE currency = ? AND is_latest = 1",
        )
        .bind(currency.code())
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_err)?;
        let current = current
            .map(|id| id.parse::<CacheEntryId>())
            .transpose()
            .map_err(db_err)?;

        if current != expected {
            return Err(RepoError::Conflict(format!(
                "latest for {} moved since it was read",
                currency
            )));
        }

        if let Some(old) = current {
            if old != candidate.id {
                let demoted = sqlx::query(
                    "UPDATE exchange_rate_cache SET is_latest = 0 WHERE id = ? AND is_latest = 1",
                )
                .bind(old.to_string())
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;
                if demoted.rows_affected() != 1 {
                    return Err(RepoError::Conflict(format!(
                        "latest {} for {} was demoted concurrently",
                        old, currency
                    )));
                }
            }
        }

        let upsert = format!("{}, is_latest = 1", UPSERT_ENTRY.trim_end());
        bind_entry(sqlx::query(&upsert), &candidate, true)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        let promoted = self.fetch_one(&mut *tx, candidate.id).await?;
        tx.commit().await.map_err(write_err)?;
        Ok(promoted)
    }

    async fn delete_all(&self, entries: &[ExchangeRateCacheEntry]) -> Result<u64, RepoError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut deleted = 0;
        for entry in entries {
            deleted += sqlx::query("DELETE FROM exchange_rate_cache WHERE id = ?")
                .bind(entry.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?
                .rows_affected();
        }
        tx.commit().await.map_err(db_err)?;
        Ok(deleted)
    }

    async fn purge(&self) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM exchange_rate_cache")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trail repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed trail store.
#[derive(Clone)]
pub struct SqliteTrailRepository {
    pool: SqlitePool,
}

impl SqliteTrailRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Sqlite>,
        date: Option<NaiveDate>,
        operation: Option<TrailOperation>,
        state: Option<TrailState>,
    ) {
        qb.push(" WHERE 1 = 1");
        if let Some(date) = date {
            qb.push(" AND trail_date = ").push_bind(date_key(date));
        }
        if let Some(operation) = operation {
            qb.push(" AND operation = ").push_bind(operation.to_string());
        }
        if let Some(state) = state {
            qb.push(" AND state = ").push_bind(state.to_string());
        }
    }

    async fn query_page(
        &self,
        date: Option<NaiveDate>,
        operation: Option<TrailOperation>,
        state: Option<TrailState>,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM trails");
        Self::push_filters(&mut count, date, operation, state);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM trails", TRAIL_COLUMNS));
        Self::push_filters(&mut select, date, operation, state);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.size as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows: Vec<DbTrail> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(DbTrail::into_domain)
                .collect::<Result<_, _>>()?,
            page: page.page,
            size: page.size,
            total: total.max(0) as u64,
        })
    }
}

#[async_trait]
impl TrailRepository for SqliteTrailRepository {
    async fn save(&self, record: TrailRecord) -> Result<TrailRecord, RepoError> {
        let affected_ids = serde_json::to_string(&record.affected_ids).map_err(db_err)?;
        let failures = serde_json::to_string(&record.failures).map_err(db_err)?;

        sqlx::query(&format!(
            "INSERT INTO trails ({}, trail_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRAIL_COLUMNS
        ))
        .bind(record.id.to_string())
        .bind(record.operation.to_string())
        .bind(record.state.to_string())
        .bind(record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .bind(record.evaluated as i64)
        .bind(record.skipped as i64)
        .bind(affected_ids)
        .bind(failures)
        .bind(date_key(record.date()))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(record)
    }

    async fn find_by_id(&self, id: TrailId) -> Result<Option<TrailRecord>, RepoError> {
        let row: Option<DbTrail> = sqlx::query_as(&format!(
            "SELECT {} FROM trails WHERE id = ?",
            TRAIL_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTrail::into_domain).transpose()
    }

    async fn find_all(&self, page: PageRequest) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(None, None, None, page).await
    }

    async fn find_by_date(
        &self,
        date: NaiveDate,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(Some(date), None, None, page).await
    }

    async fn find_by_operation(
        &self,
        operation: TrailOperation,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(None, Some(operation), None, page).await
    }

    async fn find_by_state(
        &self,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(None, None, Some(state), page).await
    }

    async fn find_by_date_and_operation(
        &self,
        date: NaiveDate,
        operation: TrailOperation,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(Some(date), Some(operation), None, page).await
    }

    async fn find_by_date_and_state(
        &self,
        date: NaiveDate,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(Some(date), None, Some(state), page).await
    }

    async fn find_by_operation_and_state(
        &self,
        operation: TrailOperation,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(None, Some(operation), Some(state), page).await
    }

    async fn find_by_date_and_operation_and_state(
        &self,
        date: NaiveDate,
        operation: TrailOperation,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError> {
        self.query_page(Some(date), Some(operation), Some(state), page)
            .await
    }
}
