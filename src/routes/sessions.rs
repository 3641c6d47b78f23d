use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::Category,
    dto::session::{
        EntryEditRequest, EntrySnapshot, OpenSessionRequest, SaveSessionRequest, SessionQuery,
        SessionSnapshot,
    },
    error::AppError,
    services::scoring_service,
    state::SharedState,
};

/// Routes driving the scoring session flow: open, inspect, edit, save.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(open_session))
        .route("/sessions/{team_id}", get(get_session).delete(close_session))
        .route("/sessions/{team_id}/entries/{player_id}", put(edit_entry))
        .route("/sessions/{team_id}/save", post(save_session))
}

#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = OpenSessionRequest,
    responses(
        (status = 200, description = "Session opened with the merged draft", body = SessionSnapshot)
    )
)]
/// Open a scoring session for a team, loading judges, roster, and any
/// persisted scores into the draft.
pub async fn open_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<OpenSessionRequest>>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = scoring_service::open_session(&state, payload).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    get,
    path = "/sessions/{team_id}",
    tag = "sessions",
    params(
        ("team_id" = Uuid, Path, description = "Team the session belongs to"),
        SessionQuery
    ),
    responses(
        (status = 200, description = "Current draft snapshot", body = SessionSnapshot),
        (status = 404, description = "No open session for this team")
    )
)]
/// Snapshot the current draft of an open session.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let category = Category::new(query.gender, query.age_group);
    let snapshot = scoring_service::session_snapshot(&state, team_id, category).await?;
    Ok(Json(snapshot))
}

#[utoipa::path(
    delete,
    path = "/sessions/{team_id}",
    tag = "sessions",
    params(
        ("team_id" = Uuid, Path, description = "Team the session belongs to"),
        SessionQuery
    ),
    responses(
        (status = 204, description = "Session closed, draft discarded"),
        (status = 404, description = "No open session for this team")
    )
)]
/// Close an open session, discarding its draft; persisted data is untouched.
pub async fn close_session(
    State(state): State<SharedState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> Result<axum::http::StatusCode, AppError> {
    let category = Category::new(query.gender, query.age_group);
    scoring_service::close_session(&state, team_id, category).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/sessions/{team_id}/entries/{player_id}",
    tag = "sessions",
    params(
        ("team_id" = Uuid, Path, description = "Team the session belongs to"),
        ("player_id" = Uuid, Path, description = "Player entry to edit"),
        SessionQuery
    ),
    request_body = EntryEditRequest,
    responses(
        (status = 200, description = "Entry updated with recomputed scores", body = EntrySnapshot),
        (status = 409, description = "Session is locked")
    )
)]
/// Apply a manual edit (time, deductions, or a judge mark) to one entry.
pub async fn edit_entry(
    State(state): State<SharedState>,
    Path((team_id, player_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<SessionQuery>,
    Valid(Json(payload)): Valid<Json<EntryEditRequest>>,
) -> Result<Json<EntrySnapshot>, AppError> {
    let category = Category::new(query.gender, query.age_group);
    let entry =
        scoring_service::edit_entry(&state, team_id, category, player_id, payload).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    post,
    path = "/sessions/{team_id}/save",
    tag = "sessions",
    params(
        ("team_id" = Uuid, Path, description = "Team the session belongs to"),
        SessionQuery
    ),
    request_body = SaveSessionRequest,
    responses(
        (status = 200, description = "Draft persisted", body = SessionSnapshot),
        (status = 409, description = "Record changed or is locked")
    )
)]
/// Explicitly persist the draft, broadcasting `scores_saved` on success.
pub async fn save_session(
    State(state): State<SharedState>,
    Path(team_id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
    Json(payload): Json<SaveSessionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let category = Category::new(query.gender, query.age_group);
    let snapshot = scoring_service::save_session(&state, team_id, category, payload).await?;
    Ok(Json(snapshot))
}
