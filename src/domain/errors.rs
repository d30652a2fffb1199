//! Domain errors for the strategist decision core.

use thiserror::Error;

/// Domain-level errors that can occur in the decision core.
///
/// Only [`DomainError::InvalidArmKey`], [`DomainError::UnknownDimension`],
/// [`DomainError::EmptyCandidateSet`] and [`DomainError::ValidationFailed`]
/// describe caller mistakes. The storage variants are recovered locally by the
/// selection and analysis paths and only surface from explicit write calls.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid arm key '{key}': {reason}")]
    InvalidArmKey { key: String, reason: String },

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Candidate arm set is empty")]
    EmptyCandidateSet,

    #[error("Arm not found: {0}")]
    ArmNotFound(String),

    #[error("Content event not found: {0}")]
    ContentNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Sampling failed: {0}")]
    SamplingFailed(String),
}

impl DomainError {
    /// True when the error comes from the backing store rather than the caller.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::SerializationError(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
