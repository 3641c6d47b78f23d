use std::error::Error;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The caller's read is stale; the record moved on underneath it.
    #[error("version conflict on score record `{id}` (expected {expected:?}, actual {actual})")]
    VersionConflict {
        id: Uuid,
        expected: Option<u64>,
        actual: u64,
    },
    /// Writes against a locked record are refused wholesale.
    #[error("score record `{id}` is locked")]
    RecordLocked { id: Uuid },
    /// Lock toggling or lookups referencing an unknown record id.
    #[error("score record `{id}` not found")]
    RecordNotFound { id: Uuid },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
