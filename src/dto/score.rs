use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    dao::models::{Gender, JudgeScoresEntity, PlayerScoreEntity, ScoreRecordEntity},
    dto::format_system_time,
};

/// Query selecting persisted records for a bucket, optionally one team.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ScoreRecordQuery {
    pub gender: Gender,
    pub age_group: String,
    pub team_id: Option<Uuid>,
}

/// Persisted score record as returned by the REST surface.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreRecordDto {
    pub id: Uuid,
    pub team_id: Uuid,
    pub gender: Gender,
    pub age_group: String,
    pub player_scores: Vec<PlayerScoreDto>,
    pub time_keeper: String,
    pub scorer: String,
    pub remarks: String,
    pub is_locked: bool,
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// One player's persisted scores.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerScoreDto {
    pub player_id: Uuid,
    pub player_name: String,
    pub time: String,
    pub judge_scores: JudgeScoresEntity,
    pub deduction: f64,
    pub other_deduction: f64,
    pub average_marks: f64,
    pub final_score: f64,
}

impl From<PlayerScoreEntity> for PlayerScoreDto {
    fn from(value: PlayerScoreEntity) -> Self {
        Self {
            player_id: value.player_id,
            player_name: value.player_name,
            time: value.time,
            judge_scores: value.judge_scores,
            deduction: value.deduction,
            other_deduction: value.other_deduction,
            average_marks: value.average_marks,
            final_score: value.final_score,
        }
    }
}

impl From<ScoreRecordEntity> for ScoreRecordDto {
    fn from(value: ScoreRecordEntity) -> Self {
        Self {
            id: value.id,
            team_id: value.team_id,
            gender: value.category.gender,
            age_group: value.category.age_group,
            player_scores: value.player_scores.into_iter().map(Into::into).collect(),
            time_keeper: value.time_keeper,
            scorer: value.scorer,
            remarks: value.remarks,
            is_locked: value.is_locked,
            version: value.version,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}
