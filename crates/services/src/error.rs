//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use trail_core::model::{CheckpointError, IdError, QuizError};

/// A backend payload that parsed as JSON but broke a domain rule.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayloadError {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error("field `{field}`: {reason}")]
    Field { field: &'static str, reason: String },
}

/// Errors emitted by the HTTP collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid api configuration: {0}")]
    InvalidConfig(String),
    #[error("session expired, sign in again")]
    Unauthorized,
    #[error("request failed with status {status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("could not decode response body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid response payload: {0}")]
    InvalidPayload(#[from] PayloadError),
}

impl ApiError {
    /// Shorthand for a field-level payload error.
    pub(crate) fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload(PayloadError::Field {
            field,
            reason: reason.into(),
        })
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::InvalidPayload(PayloadError::Id(err))
    }
}

impl From<CheckpointError> for ApiError {
    fn from(err: CheckpointError) -> Self {
        Self::InvalidPayload(PayloadError::Checkpoint(err))
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        Self::InvalidPayload(PayloadError::Quiz(err))
    }
}

/// Errors emitted by `QuizFlowService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizFlowError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Api(#[from] ApiError),
}
