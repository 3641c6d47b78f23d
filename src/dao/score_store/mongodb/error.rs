use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;

/// Result alias for MongoDB-backed operations.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Errors raised by the MongoDB score store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("invalid MongoDB URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: mongodb::error::Error,
    },
    #[error("failed to construct MongoDB client")]
    ClientConstruction {
        #[source]
        source: mongodb::error::Error,
    },
    #[error("MongoDB did not answer the initial ping after {attempts} attempts")]
    InitialPing {
        attempts: u32,
        #[source]
        source: mongodb::error::Error,
    },
    #[error("MongoDB health ping failed")]
    HealthPing {
        #[source]
        source: mongodb::error::Error,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: mongodb::error::Error,
    },
    #[error("failed to save score record `{id}`")]
    SaveRecord {
        id: Uuid,
        #[source]
        source: mongodb::error::Error,
    },
    #[error("failed to load score records")]
    LoadRecords {
        #[source]
        source: mongodb::error::Error,
    },
    #[error("failed to toggle lock on score record `{id}`")]
    LockRecord {
        id: Uuid,
        #[source]
        source: mongodb::error::Error,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
