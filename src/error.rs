use thiserror::Error;

/// Failures raised by the storage layer.
///
/// `NotFound` is the only recoverable kind; the service layer re-wraps it
/// with request context while preserving the kind. Everything else is a
/// terminal storage failure for the calling request.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested duel, participant set, or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The duel was already resolved; completed results are immutable.
    #[error("duel {0} is already completed")]
    AlreadyCompleted(i64),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Failures crossing the duel service boundary.
///
/// Callers branch on exactly three kinds: the record is missing, the
/// request was rejected, or the operation failed. No raw storage error
/// ever leaves the service unwrapped.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("duel service failure: {0}")]
    Internal(#[source] StoreError),
}
