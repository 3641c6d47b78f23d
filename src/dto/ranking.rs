use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::dao::models::Gender;

/// Query selecting the bucket to rank.
#[derive(Debug, Deserialize, IntoParams)]
pub struct RankingQuery {
    pub gender: Gender,
    pub age_group: String,
}

/// Query selecting the bucket to rank teams in, with an optional top-N override.
#[derive(Debug, Deserialize, IntoParams)]
pub struct TeamRankingQuery {
    pub gender: Gender,
    pub age_group: String,
    /// Number of finishers counted per team; defaults to the configured value.
    pub top_n: Option<usize>,
}

/// One row of the flat individual leaderboard for a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct IndividualRankingEntry {
    /// 1-based contiguous position.
    pub rank: usize,
    pub player_id: Uuid,
    pub player_name: String,
    pub team_id: Uuid,
    pub team_name: String,
    pub final_score: f64,
}

/// One row of the team leaderboard for a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TeamRankingEntry {
    /// 1-based contiguous position.
    pub rank: usize,
    pub team_id: Uuid,
    pub team_name: String,
    /// How many finishers were actually counted (may be fewer than top-N).
    pub counted_players: usize,
    /// Sum of the counted finishers' final scores.
    pub total_score: f64,
    /// `total_score` divided by `counted_players`.
    pub average_score: f64,
}
