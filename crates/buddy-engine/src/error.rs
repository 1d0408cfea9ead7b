use thiserror::Error as ThisError;

use buddy_data::{FieldError, QueryError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything the registry and the ledger can fail with.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Duplicate(String),
    #[error("Invalid credentials")]
    Unauthorized,
    #[error("Membership of {0} is under review")]
    UnderReview(String),
    #[error("Member {0} already requested to exit")]
    AlreadyExiting(String),
    #[error("Member {0} did not request to exit")]
    NotOnDelete(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Transient store failure: {0}")]
    Transient(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Store failure: {0}")]
    Storage(anyhow::Error),
}

impl Error {
    /// Name the record a NotFound or Duplicate is about.
    pub(crate) fn about(self, subject: impl Into<String>) -> Self {
        match self {
            Error::NotFound(_) => Error::NotFound(subject.into()),
            Error::Duplicate(_) => Error::Duplicate(subject.into()),
            other => other,
        }
    }

    /// The call may succeed when retried as is
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<QueryError>() {
            Some(QueryError::NotFound) => Error::NotFound("record".to_string()),
            Some(QueryError::Duplicate) => {
                Error::Duplicate("record".to_string())
            }
            Some(QueryError::Timeout(_)) | Some(QueryError::Unavailable(_)) => {
                Error::Transient(err.to_string())
            }
            Some(QueryError::Ambiguous(_)) | None => Error::Storage(err),
        }
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Self {
        Error::Validation(err.to_string())
    }
}
