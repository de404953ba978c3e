use thiserror::Error;

use crate::remote::RemoteError;

/// Failures of the write path and the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Not signed in")]
    NotAuthenticated,

    /// A remote routine has no local row yet. Resolved by the next sync pass.
    #[error("No local routine for remote id '{0}'; run `fitsync sync` first")]
    MissingLocalRoutine(String),

    #[error("Routine not found: {0}")]
    RoutineNotFound(i64),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Cache error: {0}")]
    Cache(#[from] sqlx::Error),

    #[error("Sync cancelled")]
    Cancelled,
}
