//! Trail (audit) service.

use std::sync::Arc;

use chrono::NaiveDate;

use rates_types::{
    AppError, CacheEntryId, Page, PageRequest, SyncReport, TrailId, TrailOperation, TrailQuery,
    TrailRecord, TrailRepository, TrailState,
};

/// The filter combination a trail lookup resolves to.
///
/// Built from the three optional filters, so the same filters always pick the
/// same repository query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailPredicate {
    All,
    Date(NaiveDate),
    Operation(TrailOperation),
    State(TrailState),
    DateAndOperation(NaiveDate, TrailOperation),
    DateAndState(NaiveDate, TrailState),
    OperationAndState(TrailOperation, TrailState),
    DateAndOperationAndState(NaiveDate, TrailOperation, TrailState),
}

impl TrailPredicate {
    pub fn from_filters(
        date: Option<NaiveDate>,
        operation: Option<TrailOperation>,
        state: Option<TrailState>,
    ) -> Self {
        match (date, operation, state) {
            (None, None, None) => TrailPredicate::All,
            (Some(d), None, None) => TrailPredicate::Date(d),
            (None, Some(o), None) => TrailPredicate::Operation(o),
            (None, None, Some(s)) => TrailPredicate::State(s),
            (Some(d), Some(o), None) => TrailPredicate::DateAndOperation(d, o),
            (Some(d), None, Some(s)) => TrailPredicate::DateAndState(d, s),
            (None, Some(o), Some(s)) => TrailPredicate::OperationAndState(o, s),
            (Some(d), Some(o), Some(s)) => TrailPredicate::DateAndOperationAndState(d, o, s),
        }
    }
}

impl From<&TrailQuery> for TrailPredicate {
    fn from(query: &TrailQuery) -> Self {
        TrailPredicate::from_filters(query.date, query.operation, query.state)
    }
}

/// Writes and queries trail records.
pub struct TrailService<T: TrailRepository> {
    repo: Arc<T>,
}

impl<T: TrailRepository> Clone for TrailService<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<T: TrailRepository> TrailService<T> {
    pub fn new(repo: Arc<T>) -> Self {
        Self { repo }
    }

    /// Persists one record from bare counts, stamped now.
    pub async fn save_log(
        &self,
        operation: TrailOperation,
        affected_ids: Vec<CacheEntryId>,
        evaluated: u64,
        skipped: u64,
    ) -> Result<TrailRecord, AppError> {
        let report = SyncReport {
            evaluated,
            skipped,
            affected_ids,
            failures: Vec::new(),
        };
        self.save_report(operation, report).await
    }

    /// Persists one record for a finished run, failure notes included.
    pub async fn save_report(
        &self,
        operation: TrailOperation,
        report: SyncReport,
    ) -> Result<TrailRecord, AppError> {
        self.save_record(TrailRecord::from_report(operation, report)).await
    }

    /// Persists an already built record.
    pub async fn save_record(&self, record: TrailRecord) -> Result<TrailRecord, AppError> {
        tracing::info!(
            trail_id = %record.id,
            operation = %record.operation,
            state = %record.state,
            evaluated = record.evaluated,
            skipped = record.skipped,
            "Trail recorded"
        );
        self.repo.save(record).await.map_err(Into::into)
    }

    /// Pages through the records matching `predicate`, newest first.
    pub async fn find(
        &self,
        predicate: TrailPredicate,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, AppError> {
        let result = match predicate {
            TrailPredicate::All => self.repo.find_all(page).await,
            TrailPredicate::Date(d) => self.repo.find_by_date(d, page).await,
            TrailPredicate::Operation(o) => self.repo.find_by_operation(o, page).await,
            TrailPredicate::State(s) => self.repo.find_by_state(s, page).await,
            TrailPredicate::DateAndOperation(d, o) => {
                self.repo.find_by_date_and_operation(d, o, page).await
            }
            TrailPredicate::DateAndState(d, s) => {
                self.repo.find_by_date_and_state(d, s, page).await
            }
            TrailPredicate::OperationAndState(o, s) => {
                self.repo.find_by_operation_and_state(o, s, page).await
            }
            TrailPredicate::DateAndOperationAndState(d, o, s) => {
                self.repo
                    .find_by_date_and_operation_and_state(d, o, s, page)
                    .await
            }
        };
        result.map_err(Into::into)
    }

    /// Trail lookup with optional filters; no filter returns everything.
    pub async fn find_trails(&self, query: &TrailQuery) -> Result<Page<TrailRecord>, AppError> {
        self.find(TrailPredicate::from(query), query.page_request())
            .await
    }

    pub async fn find_trail(&self, id: TrailId) -> Result<TrailRecord, AppError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Trail {}", id))))
    }
}
