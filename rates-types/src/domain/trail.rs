//! Audit trail of synchronization runs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cache_entry::CacheEntryId;
use super::currency::CurrencyCode;

/// Unique identifier for a TrailRecord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrailId(Uuid);

impl TrailId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrailId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TrailId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind of run a trail record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrailOperation {
    HistoricalUpdate,
    LatestSynchronization,
    CreateOrUpdate,
}

impl AsRef<str> for TrailOperation {
    fn as_ref(&self) -> &str {
        match self {
            Self::HistoricalUpdate => "HISTORICAL_UPDATE",
            Self::LatestSynchronization => "LATEST_SYNCHRONIZATION",
            Self::CreateOrUpdate => "CREATE_OR_UPDATE",
        }
    }
}

impl std::fmt::Display for TrailOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for TrailOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HISTORICAL_UPDATE" => Ok(Self::HistoricalUpdate),
            "LATEST_SYNCHRONIZATION" => Ok(Self::LatestSynchronization),
            "CREATE_OR_UPDATE" => Ok(Self::CreateOrUpdate),
            _ => Err(format!("Unknown trail operation: {}", s)),
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrailState {
    Success,
    Error,
}

impl AsRef<str> for TrailState {
    fn as_ref(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for TrailState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for TrailState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "ERROR" => Ok(Self::Error),
            _ => Err(format!("Unknown trail state: {}", s)),
        }
    }
}

/// Why a currency or a rate was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Network or HTTP failure reaching the provider.
    Communication,
    /// Provider call exceeded its deadline.
    Timeout,
    /// Provider answered with a payload that could not be read.
    Parse,
    /// Provider does not quote the currency.
    Unsupported,
    /// Provider had no rate to offer.
    Missing,
    /// Rate failed validation or conversion.
    Validation,
    /// Concurrent latest-flag update kept winning the race.
    Conflict,
    /// Cache backend failure.
    Storage,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Communication => "COMMUNICATION",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::Parse => "PARSE",
            FailureKind::Unsupported => "UNSUPPORTED",
            FailureKind::Missing => "MISSING",
            FailureKind::Validation => "VALIDATION",
            FailureKind::Conflict => "CONFLICT",
            FailureKind::Storage => "STORAGE",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single skipped item, kept on the trail for diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailFailure {
    pub currency: CurrencyCode,
    pub kind: FailureKind,
    pub message: String,
}

/// Running tally of a synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub evaluated: u64,
    pub skipped: u64,
    pub affected_ids: Vec<CacheEntryId>,
    pub failures: Vec<TrailFailure>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one evaluated item that touched `id`.
    pub fn record_success(&mut self, id: CacheEntryId) {
        self.evaluated += 1;
        self.affected_ids.push(id);
    }

    /// Counts one skipped item.
    pub fn record_skip(
        &mut self,
        currency: CurrencyCode,
        kind: FailureKind,
        message: impl Into<String>,
    ) {
        self.skipped += 1;
        self.failures.push(TrailFailure {
            currency,
            kind,
            message: message.into(),
        });
    }

    pub fn merge(&mut self, other: SyncReport) {
        self.evaluated += other.evaluated;
        self.skipped += other.skipped;
        self.affected_ids.extend(other.affected_ids);
        self.failures.extend(other.failures);
    }

    /// A run succeeds when it produced at least one usable result.
    pub fn state(&self) -> TrailState {
        if self.evaluated > 0 {
            TrailState::Success
        } else {
            TrailState::Error
        }
    }
}

/// An immutable audit entry for one synchronization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailRecord {
    pub id: TrailId,
    pub operation: TrailOperation,
    pub state: TrailState,
    pub timestamp: DateTime<Utc>,
    pub evaluated: u64,
    pub skipped: u64,
    pub affected_ids: Vec<CacheEntryId>,
    #[serde(default)]
    pub failures: Vec<TrailFailure>,
}

impl TrailRecord {
    /// Builds a record from a finished run, stamped with the current time.
    pub fn from_report(operation: TrailOperation, report: SyncReport) -> Self {
        Self {
            id: TrailId::new(),
            operation,
            state: report.state(),
            timestamp: Utc::now(),
            evaluated: report.evaluated,
            skipped: report.skipped,
            affected_ids: report.affected_ids,
            failures: report.failures,
        }
    }

    /// Calendar day (UTC) the record was written on.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_report_state() {
        let mut report = SyncReport::new();
        assert_eq!(report.state(), TrailState::Error);

        report.record_skip(CurrencyCode::USD, FailureKind::Timeout, "deadline");
        assert_eq!(report.state(), TrailState::Error);

        let id = CacheEntryId::for_rate(
            CurrencyCode::EUR,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        );
        report.record_success(id);
        assert_eq!(report.state(), TrailState::Success);
        assert_eq!(report.evaluated + report.skipped, 2);
    }

    #[test]
    fn test_record_from_report() {
        let mut report = SyncReport::new();
        report.record_skip(CurrencyCode::USD, FailureKind::Communication, "refused");
        let record = TrailRecord::from_report(TrailOperation::LatestSynchronization, report);

        assert_eq!(record.state, TrailState::Error);
        assert_eq!(record.skipped, 1);
        assert_eq!(record.failures[0].kind, FailureKind::Communication);
        assert_eq!(record.date(), record.timestamp.date_naive());
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!(
            "latest_synchronization".parse::<TrailOperation>().unwrap(),
            TrailOperation::LatestSynchronization
        );
        assert!("nope".parse::<TrailState>().is_err());
    }
}
