//! Per-currency failures collected during a batch run.

use rates_types::{DomainError, FailureKind, ProviderError, RepoError};

/// Why one currency (or one rate) was skipped.
#[derive(Debug, Clone)]
pub(crate) struct Skip {
    pub kind: FailureKind,
    pub message: String,
}

impl Skip {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ProviderError> for Skip {
    fn from(err: ProviderError) -> Self {
        Skip::new(err.failure_kind(), err.to_string())
    }
}

impl From<DomainError> for Skip {
    fn from(err: DomainError) -> Self {
        Skip::new(FailureKind::Validation, err.to_string())
    }
}

impl From<RepoError> for Skip {
    fn from(err: RepoError) -> Self {
        let kind = match &err {
            RepoError::Conflict(_) => FailureKind::Conflict,
            RepoError::Domain(_) => FailureKind::Validation,
            RepoError::Database(_) | RepoError::NotFound => FailureKind::Storage,
        };
        Skip::new(kind, err.to_string())
    }
}
