//! Business logic powering the scoring session flow: loading rosters, merging
//! live events into drafts, explicit saves, and the lock state machine.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{models::Category, storage::StorageError},
    dto::{
        score::{ScoreRecordDto, ScoreRecordQuery},
        session::{
            EntryEditRequest, EntrySnapshot, OpenSessionRequest, SaveSessionRequest,
            SessionSnapshot,
        },
        ws::ScoreUpdateBroadcast,
    },
    error::ServiceError,
    providers::TeamRoster,
    services::events,
    state::{
        SharedState,
        session::{DraftError, LiveMergeOutcome, ScoringSession},
    },
};

/// Open a scoring session for one team within a bucket.
///
/// Loads the judge panel (empty-name judges dropped), the team roster widened
/// to every team in the category for cross-team live viewing, and any
/// persisted record; the merged draft is registered as the single live
/// session for the (team, bucket) pair, replacing a previous one.
pub async fn open_session(
    state: &SharedState,
    request: OpenSessionRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let category = Category::new(request.gender, request.age_group);
    let store = state.require_score_store().await?;

    let judges = state
        .judge_roster()
        .judges(category.clone())
        .await?
        .into_iter()
        .filter(|judge| !judge.name.trim().is_empty())
        .collect::<Vec<_>>();
    if judges.is_empty() {
        warn!(room = %category.room_id(), "no judges assigned to category");
    }

    let own_players = state.roster().team_players(request.team_id).await?;
    let mut teams = state.roster().teams_in_category(category.clone()).await?;
    match teams.iter_mut().find(|team| team.id == request.team_id) {
        Some(team) => team.players = own_players,
        None => teams.push(TeamRoster {
            id: request.team_id,
            name: String::new(),
            players: own_players,
        }),
    }

    let existing = store
        .find_records(Some(request.team_id), category.clone())
        .await?
        .into_iter()
        .next();

    let mut session = ScoringSession::new(request.team_id, category.clone());
    session.hydrate(judges, teams, existing)?;

    let handle = state.install_session((request.team_id, category), session);
    let guard = handle.lock().await;
    Ok((&*guard).into())
}

/// Current draft snapshot of an open session.
pub async fn session_snapshot(
    state: &SharedState,
    team_id: Uuid,
    category: Category,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state
        .session(&(team_id, category))
        .ok_or_else(|| ServiceError::NotFound(format!("no open session for team `{team_id}`")))?;
    let guard = handle.lock().await;
    Ok((&*guard).into())
}

/// Apply a manual edit (time, deductions, or a judge mark) to one draft entry.
pub async fn edit_entry(
    state: &SharedState,
    team_id: Uuid,
    category: Category,
    player_id: Uuid,
    request: EntryEditRequest,
) -> Result<EntrySnapshot, ServiceError> {
    let handle = state
        .session(&(team_id, category))
        .ok_or_else(|| ServiceError::NotFound(format!("no open session for team `{team_id}`")))?;
    let mut session = handle.lock().await;

    let draft = session
        .edit_entry(player_id, request.into())
        .map_err(draft_error)?;
    Ok(draft.into())
}

/// Persist the draft of an open session.
///
/// Plans the save transition, writes through the store with the version the
/// draft was read from, and broadcasts `scores_saved` on success. Any failure
/// aborts the transition, leaving the phase and the draft intact so the user
/// can retry without re-entering data.
pub async fn save_session(
    state: &SharedState,
    team_id: Uuid,
    category: Category,
    request: SaveSessionRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state
        .session(&(team_id, category))
        .ok_or_else(|| ServiceError::NotFound(format!("no open session for team `{team_id}`")))?;
    let store = state.require_score_store().await?;
    let mut session = handle.lock().await;

    session
        .set_audit(request.time_keeper, request.scorer, request.remarks)
        .map_err(draft_error)?;

    let plan = session.plan_save()?;
    let record = session.to_record();
    let expected_version = session.record_version;

    match store.upsert_record(record, expected_version).await {
        Ok(stored) => {
            session.adopt_saved(&stored);
            session.apply_transition(plan.id)?;
            events::broadcast_scores_saved(state, &session.category, team_id);
            Ok((&*session).into())
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transition(plan.id) {
                warn!(
                    plan_id = %plan.id,
                    error = ?abort_err,
                    "failed to abort save transition after storage error"
                );
            }
            if matches!(err, StorageError::RecordLocked { .. }) {
                // Another admin locked the record; the session follows suit.
                let _ = session.observe_lock();
            }
            Err(err.into())
        }
    }
}

/// Merge a live score event into every open draft of its bucket.
///
/// Locked sessions drop the event; unknown players are synthesized as
/// placeholder entries so late-joining dashboards stay usable.
pub async fn merge_live_update(
    state: &SharedState,
    category: &Category,
    update: &ScoreUpdateBroadcast,
) {
    for handle in state.sessions_in_category(category) {
        let mut session = handle.lock().await;
        match session.apply_live(update) {
            LiveMergeOutcome::Synthesized => {
                debug!(
                    player = %update.player_id,
                    room = %update.room,
                    "synthesized placeholder entry for unknown player"
                );
            }
            LiveMergeOutcome::IgnoredLocked => {
                debug!(room = %update.room, "locked session ignored live update");
            }
            LiveMergeOutcome::Applied => {}
        }
    }
}

/// Close an open session, discarding its draft.
///
/// Persisted data is untouched; the next open re-reads it from the store.
pub async fn close_session(
    state: &SharedState,
    team_id: Uuid,
    category: Category,
) -> Result<(), ServiceError> {
    state
        .remove_session(&(team_id, category))
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("no open session for team `{team_id}`")))
}

/// Persisted records for a bucket, optionally narrowed to one team.
pub async fn list_records(
    state: &SharedState,
    query: ScoreRecordQuery,
) -> Result<Vec<ScoreRecordDto>, ServiceError> {
    let store = state.require_score_store().await?;
    let category = Category::new(query.gender, query.age_group);
    let records = store.find_records(query.team_id, category).await?;
    Ok(records.into_iter().map(Into::into).collect())
}

/// Toggle the lock flag of a persisted record and propagate the observation
/// to every open session holding that record.
pub async fn set_record_lock(
    state: &SharedState,
    record_id: Uuid,
    locked: bool,
) -> Result<ScoreRecordDto, ServiceError> {
    let store = state.require_score_store().await?;
    let stored = store.set_lock(record_id, locked).await?;

    for handle in state.all_sessions() {
        let mut session = handle.lock().await;
        if session.record_id != Some(record_id) {
            continue;
        }

        let transition = if locked {
            session.observe_lock()
        } else {
            session.observe_unlock()
        };
        match transition {
            Ok(_) => session.adopt_saved(&stored),
            // An unlock for a session that never saw the lock is a no-op.
            Err(_) => debug!(record = %record_id, "lock observation skipped"),
        }
    }

    Ok(stored.into())
}

fn draft_error(err: DraftError) -> ServiceError {
    match err {
        DraftError::Locked => ServiceError::Locked("scoring session".into()),
        DraftError::UnknownPlayer(player_id) => {
            ServiceError::NotFound(format!("player `{player_id}` not in draft"))
        }
    }
}
