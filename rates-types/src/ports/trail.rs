//! Trail repository port.
//!
//! One query per predicate combination; the trail service picks the most
//! specific one for the filters it was given.

use chrono::NaiveDate;

use crate::domain::{TrailId, TrailOperation, TrailRecord, TrailState};
use crate::dto::{Page, PageRequest};
use crate::error::RepoError;

/// Append-only store of trail records. Pages are ordered newest first.
#[async_trait::async_trait]
pub trait TrailRepository: Send + Sync + 'static {
    async fn save(&self, record: TrailRecord) -> Result<TrailRecord, RepoError>;

    async fn find_by_id(&self, id: TrailId) -> Result<Option<TrailRecord>, RepoError>;

    async fn find_all(&self, page: PageRequest) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_date(
        &self,
        date: NaiveDate,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_operation(
        &self,
        operation: TrailOperation,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_state(
        &self,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_date_and_operation(
        &self,
        date: NaiveDate,
        operation: TrailOperation,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_date_and_state(
        &self,
        date: NaiveDate,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_operation_and_state(
        &self,
        operation: TrailOperation,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;

    async fn find_by_date_and_operation_and_state(
        &self,
        date: NaiveDate,
        operation: TrailOperation,
        state: TrailState,
        page: PageRequest,
    ) -> Result<Page<TrailRecord>, RepoError>;
}
