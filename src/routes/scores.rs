use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::score::{ScoreRecordDto, ScoreRecordQuery},
    error::AppError,
    services::scoring_service,
    state::SharedState,
};

/// Routes exposing persisted score records and the admin lock toggle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/scores", get(list_scores))
        .route("/scores/{id}/lock", post(lock_score))
        .route("/scores/{id}/unlock", post(unlock_score))
}

#[utoipa::path(
    get,
    path = "/scores",
    tag = "scores",
    params(ScoreRecordQuery),
    responses(
        (status = 200, description = "Persisted score records for the bucket", body = [ScoreRecordDto])
    )
)]
/// List persisted score records for a bucket, optionally narrowed to one team.
pub async fn list_scores(
    State(state): State<SharedState>,
    Query(query): Query<ScoreRecordQuery>,
) -> Result<Json<Vec<ScoreRecordDto>>, AppError> {
    let records = scoring_service::list_records(&state, query).await?;
    Ok(Json(records))
}

#[utoipa::path(
    post,
    path = "/scores/{id}/lock",
    tag = "scores",
    params(("id" = Uuid, Path, description = "Identifier of the score record")),
    responses(
        (status = 200, description = "Record locked", body = ScoreRecordDto),
        (status = 404, description = "Unknown record")
    )
)]
/// Finalize a score record, freezing it against further mutation.
pub async fn lock_score(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreRecordDto>, AppError> {
    let record = scoring_service::set_record_lock(&state, id, true).await?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/scores/{id}/unlock",
    tag = "scores",
    params(("id" = Uuid, Path, description = "Identifier of the score record")),
    responses(
        (status = 200, description = "Record unlocked", body = ScoreRecordDto),
        (status = 404, description = "Unknown record")
    )
)]
/// Lift the lock on a score record to permit corrections.
pub async fn unlock_score(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreRecordDto>, AppError> {
    let record = scoring_service::set_record_lock(&state, id, false).await?;
    Ok(Json(record))
}
