use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoScoreDocument, doc_id, triple_filter},
};
use crate::dao::{
    models::{Category, ScoreRecordEntity},
    score_store::ScoreStore,
    storage::{StorageError, StorageResult},
};

const SCORE_COLLECTION_NAME: &str = "score_records";

/// Outcome of a single upsert attempt against the triple.
enum UpsertOutcome {
    Stored(ScoreRecordEntity),
    /// Another writer created the triple between our read and our insert.
    LostCreationRace,
}

#[derive(Clone)]
pub struct MongoScoreStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoScoreStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Unique index on the identity triple; a racing creation surfaces as a
    /// duplicate-key error which the upsert path resolves as an update.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"team_id": 1, "gender": 1, "age_group": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("score_triple_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SCORE_COLLECTION_NAME,
                index: "team_id,gender,age_group",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoScoreDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoScoreDocument>(SCORE_COLLECTION_NAME)
    }

    async fn find_records(
        &self,
        team_id: Option<Uuid>,
        category: Category,
    ) -> StorageResult<Vec<ScoreRecordEntity>> {
        let collection = self.collection().await;

        let mut filter = doc! {
            "gender": category.gender.as_str(),
            "age_group": category.age_group.as_str(),
        };
        if let Some(team) = team_id {
            filter.insert("team_id", super::models::uuid_as_binary(team));
        }

        let documents: Vec<MongoScoreDocument> = collection
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::LoadRecords { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadRecords { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn upsert_record(
        &self,
        record: ScoreRecordEntity,
        expected_version: Option<u64>,
    ) -> StorageResult<ScoreRecordEntity> {
        match self.upsert_once(record.clone(), expected_version).await? {
            UpsertOutcome::Stored(stored) => Ok(stored),
            UpsertOutcome::LostCreationRace => {
                // The winner's document is visible now, so the retry takes
                // the update path; treat a second miss as a conflict.
                match self.upsert_once(record.clone(), expected_version).await? {
                    UpsertOutcome::Stored(stored) => Ok(stored),
                    UpsertOutcome::LostCreationRace => Err(StorageError::VersionConflict {
                        id: record.id,
                        expected: expected_version,
                        actual: 0,
                    }),
                }
            }
        }
    }

    async fn upsert_once(
        &self,
        mut record: ScoreRecordEntity,
        expected_version: Option<u64>,
    ) -> StorageResult<UpsertOutcome> {
        let collection = self.collection().await;
        let filter = triple_filter(record.team_id, &record.category);
        record.updated_at = SystemTime::now();
        record.is_locked = false;

        let existing = collection
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadRecords { source })?;

        let Some(current_doc) = existing else {
            record.version = 1;
            record.created_at = record.updated_at;
            let document: MongoScoreDocument = record.clone().into();
            return match collection.insert_one(&document).await {
                Ok(_) => Ok(UpsertOutcome::Stored(record)),
                Err(err) if is_duplicate_key(&err) => Ok(UpsertOutcome::LostCreationRace),
                Err(source) => Err(MongoDaoError::SaveRecord {
                    id: record.id,
                    source,
                }
                .into()),
            };
        };

        let current: ScoreRecordEntity = current_doc.into();
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

        record.id = current.id;
        record.created_at = current.created_at;
        record.version = current.version + 1;

        let document: MongoScoreDocument = record.clone().into();
        let mut guard_filter = doc_id(current.id);
        guard_filter.insert("version", current.version as i64);
        guard_filter.insert("is_locked", false);

        let result = collection
            .replace_one(guard_filter, &document)
            .await
            .map_err(|source| MongoDaoError::SaveRecord {
                id: record.id,
                source,
            })?;

        if result.modified_count == 0 {
            return Err(StorageError::VersionConflict {
                id: current.id,
                expected: expected_version,
                actual: current.version,
            });
        }

        Ok(UpsertOutcome::Stored(record))
    }

    async fn set_lock(&self, record_id: Uuid, locked: bool) -> StorageResult<ScoreRecordEntity> {
        let collection = self.collection().await;

        let current = collection
            .find_one(doc_id(record_id))
            .await
            .map_err(|source| MongoDaoError::LockRecord {
                id: record_id,
                source,
            })?
            .map(ScoreRecordEntity::from)
            .ok_or(StorageError::RecordNotFound { id: record_id })?;

        if current.is_locked == locked {
            return Ok(current);
        }

        let mut updated = current.clone();
        updated.is_locked = locked;
        updated.version = current.version + 1;
        updated.updated_at = SystemTime::now();

        let mut guard_filter = doc_id(record_id);
        guard_filter.insert("version", current.version as i64);

        let result = collection
            .update_one(
                guard_filter,
                doc! {"$set": {
                    "is_locked": locked,
                    "version": updated.version as i64,
                    "updated_at": DateTime::from_system_time(updated.updated_at),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::LockRecord {
                id: record_id,
                source,
            })?;

        if result.modified_count == 0 {
            return Err(StorageError::VersionConflict {
                id: record_id,
                expected: Some(current.version),
                actual: current.version,
            });
        }

        Ok(updated)
    }
}

/// Whether a write failed on the unique triple index.
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

impl ScoreStore for MongoScoreStore {
    fn find_records(
        &self,
        team_id: Option<Uuid>,
        category: Category,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_records(team_id, category).await })
    }

    fn upsert_record(
        &self,
        record: ScoreRecordEntity,
        expected_version: Option<u64>,
    ) -> BoxFuture<'static, StorageResult<ScoreRecordEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_record(record, expected_version).await })
    }

    fn set_lock(
        &self,
        record_id: Uuid,
        locked: bool,
    ) -> BoxFuture<'static, StorageResult<ScoreRecordEntity>> {
        let store = self.clone();
        Box::pin(async move { store.set_lock(record_id, locked).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
