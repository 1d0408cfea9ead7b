use std::time::Duration;

use thiserror::Error as ThisError;

/// Errors reported by a store implementation. They travel
/// inside `anyhow::Error` and can be recovered with `downcast_ref`.
#[derive(Debug, Clone, ThisError)]
pub enum QueryError {
    #[error("Not found")]
    NotFound,
    #[error("Ambiguous results ({0:?}) for query")]
    Ambiguous(usize),
    #[error("Unique key already taken")]
    Duplicate,
    #[error("Store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
