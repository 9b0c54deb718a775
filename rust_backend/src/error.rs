//! Crate-level error type.

use crate::algorithms::AccountingError;
use crate::db::repository::RepositoryError;

pub type OmpResult<T> = Result<T, OmpError>;

#[derive(Debug, thiserror::Error)]
pub enum OmpError {
    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Bad arguments: {0}")]
    BadArgs(String),

    #[error("No MSB matches checksum {0}")]
    MsbMissing(String),

    #[error(transparent)]
    InvalidRecord(#[from] AccountingError),

    #[error(transparent)]
    Database(#[from] RepositoryError),

    #[error("Fatal: {0}")]
    Fatal(String),
}

impl OmpError {
    pub fn bad_args(message: impl Into<String>) -> Self {
        OmpError::BadArgs(message.into())
    }
}
