use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::ranking::{IndividualRankingEntry, RankingQuery, TeamRankingEntry, TeamRankingQuery},
    error::AppError,
    services::ranking_service,
    state::SharedState,
};

/// Routes serving the query-time leaderboards.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rankings/individual", get(individual_rankings))
        .route("/rankings/teams", get(team_rankings))
}

#[utoipa::path(
    get,
    path = "/rankings/individual",
    tag = "rankings",
    params(RankingQuery),
    responses(
        (status = 200, description = "Flat individual leaderboard for the bucket", body = [IndividualRankingEntry])
    )
)]
/// Individual leaderboard across every team of a bucket.
pub async fn individual_rankings(
    State(state): State<SharedState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Vec<IndividualRankingEntry>>, AppError> {
    let rankings = ranking_service::individual_rankings(&state, query).await?;
    Ok(Json(rankings))
}

#[utoipa::path(
    get,
    path = "/rankings/teams",
    tag = "rankings",
    params(TeamRankingQuery),
    responses(
        (status = 200, description = "Team leaderboard computed from top-N finishers", body = [TeamRankingEntry])
    )
)]
/// Team leaderboard computed from each team's top-N individual finishers.
pub async fn team_rankings(
    State(state): State<SharedState>,
    Query(query): Query<TeamRankingQuery>,
) -> Result<Json<Vec<TeamRankingEntry>>, AppError> {
    let rankings = ranking_service::team_rankings(&state, query).await?;
    Ok(Json(rankings))
}
