//! In-memory score store used by tests and as a storage-less dev fallback.

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{Category, ScoreRecordEntity},
    score_store::ScoreStore,
    storage::{StorageError, StorageResult},
};

type TripleKey = (Uuid, Category);

/// Score store backed by a process-local map.
///
/// The entry API makes racing creations for one triple collapse into an
/// update of the same slot, mirroring the unique-index behavior of the
/// database-backed stores.
#[derive(Clone, Default)]
pub struct MemoryScoreStore {
    records: Arc<DashMap<TripleKey, ScoreRecordEntity>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_records_sync(
        &self,
        team_id: Option<Uuid>,
        category: Category,
    ) -> Vec<ScoreRecordEntity> {
        self.records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.category == category
                    && team_id.is_none_or(|team| record.team_id == team)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn upsert_record_sync(
        &self,
        mut record: ScoreRecordEntity,
        expected_version: Option<u64>,
    ) -> StorageResult<ScoreRecordEntity> {
        let key = (record.team_id, record.category.clone());
        record.updated_at = SystemTime::now();
        record.is_locked = false;

        match self.records.entry(key) {
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if current.is_locked {
                    return Err(StorageError::RecordLocked { id: current.id });
                }
                if let Some(expected) = expected_version {
                    if expected != current.version {
                        return Err(StorageError::VersionConflict {
                            id: current.id,
                            expected: expected_version,
                            actual: current.version,
                        });
                    }
                }
                // `expected_version = None` against an existing record is the
                // duplicate-creation race; it resolves as a plain update.
                record.id = current.id;
                record.created_at = current.created_at;
                record.version = current.version + 1;
                slot.insert(record.clone());
                Ok(record)
            }
            Entry::Vacant(slot) => {
                record.version = 1;
                record.created_at = record.updated_at;
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    fn set_lock_sync(&self, record_id: Uuid, locked: bool) -> StorageResult<ScoreRecordEntity> {
        for mut entry in self.records.iter_mut() {
            let record = entry.value_mut();
            if record.id == record_id {
                if record.is_locked != locked {
                    record.is_locked = locked;
                    record.version += 1;
                    record.updated_at = SystemTime::now();
                }
                return Ok(record.clone());
            }
        }

        Err(StorageError::RecordNotFound { id: record_id })
    }
}

impl ScoreStore for MemoryScoreStore {
    fn find_records(
        &self,
        team_id: Option<Uuid>,
        category: Category,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_records_sync(team_id, category)) })
    }

    fn upsert_record(
        &self,
        record: ScoreRecordEntity,
        expected_version: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<ScoreRecordEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_record_sync(record, expected_version) })
    }

    fn set_lock(
        &self,
        record_id: Uuid,
        locked: bool,
    ) -> BoxFuture<'static, StorageResult<ScoreRecordEntity>> {
        let store = self.clone();
        Box::pin(async move { store.set_lock_sync(record_id, locked) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
