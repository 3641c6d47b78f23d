pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{Category, ScoreRecordEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for score records.
///
/// A backend stores at most one record per (team, gender, age-group) triple;
/// concurrent creations for the same triple must collapse into an idempotent
/// update rather than surface a duplicate-key error.
pub trait ScoreStore: Send + Sync {
    /// Records for a bucket; `team_id = None` returns the whole bucket.
    fn find_records(
        &self,
        team_id: Option<Uuid>,
        category: Category,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreRecordEntity>>>;

    /// Full replacement write for one triple.
    ///
    /// `expected_version` is the version the caller read (`None` for a first
    /// write); the stored record is returned with its bumped version. Stale
    /// versions and locked records are rejected without touching the data.
    fn upsert_record(
        &self,
        record: ScoreRecordEntity,
        expected_version: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<ScoreRecordEntity>>;

    /// Toggle the lock flag of a record, idempotently.
    fn set_lock(
        &self,
        record_id: Uuid,
        locked: bool,
    ) -> BoxFuture<'static, StorageResult<ScoreRecordEntity>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
