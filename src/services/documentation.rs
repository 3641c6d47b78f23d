use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Scorestream Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scores::list_scores,
        crate::routes::scores::lock_score,
        crate::routes::scores::unlock_score,
        crate::routes::sessions::open_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::close_session,
        crate::routes::sessions::edit_entry,
        crate::routes::sessions::save_session,
        crate::routes::rankings::individual_rankings,
        crate::routes::rankings::team_rankings,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::score::ScoreRecordDto,
            crate::dto::score::PlayerScoreDto,
            crate::dto::session::OpenSessionRequest,
            crate::dto::session::EntryEditRequest,
            crate::dto::session::SaveSessionRequest,
            crate::dto::session::SessionSnapshot,
            crate::dto::session::EntrySnapshot,
            crate::dto::session::VisibleSessionPhase,
            crate::dto::ranking::IndividualRankingEntry,
            crate::dto::ranking::TeamRankingEntry,
            crate::dto::ws::ScoringInboundMessage,
            crate::dto::ws::ScoringOutboundMessage,
            crate::dto::ws::ScoreUpdateBroadcast,
            crate::dto::ws::ScoresSavedBroadcast,
            crate::dao::models::Gender,
            crate::dao::models::JudgeType,
            crate::dao::models::JudgeScoresEntity,
            crate::providers::Judge,
        )
    ),
    tags(
        (name = "scores", description = "Persisted score records and lock administration"),
        (name = "sessions", description = "Live scoring sessions"),
        (name = "rankings", description = "Individual and team leaderboards"),
    )
)]
pub struct ApiDoc;
