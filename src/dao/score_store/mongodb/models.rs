use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{Category, Gender, PlayerScoreEntity, ScoreRecordEntity};

/// Persisted shape of a score record.
///
/// The identity triple is flattened into top-level fields so the unique index
/// and bucket filters can address them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    team_id: Uuid,
    gender: Gender,
    age_group: String,
    player_scores: Vec<PlayerScoreEntity>,
    #[serde(default)]
    time_keeper: String,
    #[serde(default)]
    scorer: String,
    #[serde(default)]
    remarks: String,
    #[serde(default)]
    is_locked: bool,
    #[serde(default)]
    version: i64,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<ScoreRecordEntity> for MongoScoreDocument {
    fn from(value: ScoreRecordEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            gender: value.category.gender,
            age_group: value.category.age_group,
            player_scores: value.player_scores,
            time_keeper: value.time_keeper,
            scorer: value.scorer,
            remarks: value.remarks,
            is_locked: value.is_locked,
            version: value.version as i64,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoScoreDocument> for ScoreRecordEntity {
    fn from(value: MongoScoreDocument) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            category: Category {
                gender: value.gender,
                age_group: value.age_group,
            },
            player_scores: value.player_scores,
            time_keeper: value.time_keeper,
            scorer: value.scorer,
            remarks: value.remarks,
            is_locked: value.is_locked,
            version: value.version.max(0) as u64,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}

/// Filter addressing the unique (team, gender, age-group) triple.
pub fn triple_filter(team_id: Uuid, category: &Category) -> Document {
    doc! {
        "team_id": uuid_as_binary(team_id),
        "gender": category.gender.as_str(),
        "age_group": category.age_group.as_str(),
    }
}
