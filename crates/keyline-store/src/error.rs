/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the store answered.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The connection has been closed.
    #[error("store connection is closed")]
    Closed,

    /// A connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other failure reported by the backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// The connection configuration is unusable.
    #[error("invalid store config: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Returns `true` if the error came from the caller's context rather
    /// than the store.
    pub fn is_context_error(&self) -> bool {
        matches!(self, StoreError::Cancelled | StoreError::DeadlineExceeded)
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
