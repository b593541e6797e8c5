use thiserror::Error;

/// Failures surfaced by the sync core. None of them are fatal: each one is
/// scoped to the operation that produced it and leaves the store unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Already processing notification {0}")]
    AlreadyProcessing(String),
    #[error("Remote mutation failed: {0}")]
    RemoteMutationFailed(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
