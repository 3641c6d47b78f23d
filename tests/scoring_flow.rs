//! End-to-end flow over the in-memory store: open a session, merge live
//! judge events, save, lock, and read the leaderboards.

use std::sync::Arc;

use uuid::Uuid;

use scorestream_back::{
    config::AppConfig,
    dao::{
        models::{Category, Gender, JudgeType},
        score_store::memory::MemoryScoreStore,
    },
    dto::{
        ranking::{RankingQuery, TeamRankingQuery},
        session::{EntryEditRequest, OpenSessionRequest, SaveSessionRequest, VisibleSessionPhase},
        ws::{RoomEvent, ScoreUpdateBroadcast},
    },
    error::ServiceError,
    providers::{Judge, Player, StaticRoster, TeamRoster},
    services::{events, ranking_service, scoring_service},
    state::{AppState, SharedState},
};

fn bucket() -> Category {
    Category::new(Gender::Female, "u12")
}

struct Fixture {
    state: SharedState,
    team_a: Uuid,
    team_b: Uuid,
    player_a1: Uuid,
    player_a2: Uuid,
    player_b1: Uuid,
}

async fn fixture() -> Fixture {
    let team_a = Uuid::new_v4();
    let team_b = Uuid::new_v4();
    let player_a1 = Uuid::new_v4();
    let player_a2 = Uuid::new_v4();
    let player_b1 = Uuid::new_v4();

    let player = |id, name: &str, team_id| Player {
        id,
        name: name.into(),
        team_id,
    };

    let roster = StaticRoster::default()
        .with_team(
            bucket(),
            TeamRoster {
                id: team_a,
                name: "Harbor".into(),
                players: vec![
                    player(player_a1, "Mei", team_a),
                    player(player_a2, "Iris", team_a),
                ],
            },
        )
        .with_team(
            bucket(),
            TeamRoster {
                id: team_b,
                name: "Summit".into(),
                players: vec![player(player_b1, "Noa", team_b)],
            },
        )
        .with_judge(
            bucket(),
            Judge {
                judge_no: 1,
                judge_type: JudgeType::SeniorJudge,
                name: "Lena".into(),
                username: "lena".into(),
            },
        )
        .with_judge(
            bucket(),
            Judge {
                judge_no: 2,
                judge_type: JudgeType::Judge1,
                // Unassigned seat: filtered out of the session panel.
                name: "".into(),
                username: "seat2".into(),
            },
        );

    let provider = Arc::new(roster);
    let state = AppState::new(AppConfig::default(), provider.clone(), provider);
    state
        .install_score_store(Arc::new(MemoryScoreStore::new()))
        .await;

    Fixture {
        state,
        team_a,
        team_b,
        player_a1,
        player_a2,
        player_b1,
    }
}

fn open_request(team_id: Uuid) -> OpenSessionRequest {
    OpenSessionRequest {
        team_id,
        gender: Gender::Female,
        age_group: "u12".into(),
    }
}

fn judge_event(player_id: Uuid, name: &str, judge_type: JudgeType, score: f64) -> ScoreUpdateBroadcast {
    ScoreUpdateBroadcast {
        room: bucket().room_id(),
        player_id,
        player_name: name.into(),
        judge_type,
        score,
    }
}

/// Publish a judge event the way the socket service does: fan out to the
/// room, then merge into open drafts.
async fn publish(state: &SharedState, update: ScoreUpdateBroadcast) {
    events::broadcast_score_update(state, update.clone());
    scoring_service::merge_live_update(state, &bucket(), &update).await;
}

#[tokio::test]
async fn session_opens_with_roster_and_filtered_judges() {
    let fx = fixture().await;

    let snapshot = scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();

    assert_eq!(snapshot.phase, VisibleSessionPhase::Ready);
    // Own team plus the rest of the bucket for cross-team viewing.
    assert_eq!(snapshot.entries.len(), 3);
    assert_eq!(snapshot.entries[0].team_id, Some(fx.team_a));
    // The empty-name judge never reaches the panel.
    assert_eq!(snapshot.judges.len(), 1);
    assert_eq!(snapshot.judges[0].name, "Lena");
}

#[tokio::test]
async fn live_events_fan_out_and_land_in_the_draft() {
    let fx = fixture().await;
    scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();

    let mut room = fx.state.rooms().subscribe(&bucket().room_id());

    publish(&fx.state, judge_event(fx.player_a1, "Mei", JudgeType::SeniorJudge, 8.0)).await;

    match room.recv().await.unwrap() {
        RoomEvent::ScoreUpdate(update) => {
            assert_eq!(update.player_id, fx.player_a1);
            assert_eq!(update.score, 8.0);
        }
        other => panic!("unexpected room event: {other:?}"),
    }

    let snapshot = scoring_service::session_snapshot(&fx.state, fx.team_a, bucket())
        .await
        .unwrap();
    let entry = snapshot
        .entries
        .iter()
        .find(|entry| entry.player_id == fx.player_a1)
        .unwrap();
    assert_eq!(entry.judge_scores.senior_judge, 8.0);
    assert_eq!(entry.average_marks, 8.0);
    assert_eq!(entry.final_score, 8.0);
}

#[tokio::test]
async fn save_persists_computed_scores_and_broadcasts() {
    let fx = fixture().await;
    scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();

    // Four judges scored: the trimmed mean drops 6.0 and 9.0.
    for (judge_type, score) in [
        (JudgeType::SeniorJudge, 7.0),
        (JudgeType::Judge1, 8.0),
        (JudgeType::Judge2, 9.0),
        (JudgeType::Judge3, 6.0),
    ] {
        publish(&fx.state, judge_event(fx.player_a1, "Mei", judge_type, score)).await;
    }
    scoring_service::edit_entry(
        &fx.state,
        fx.team_a,
        bucket(),
        fx.player_a1,
        EntryEditRequest {
            deduction: Some(0.5),
            ..EntryEditRequest::default()
        },
    )
    .await
    .unwrap();

    let mut room = fx.state.rooms().subscribe(&bucket().room_id());

    let snapshot = scoring_service::save_session(
        &fx.state,
        fx.team_a,
        bucket(),
        SaveSessionRequest {
            scorer: Some("desk".into()),
            ..SaveSessionRequest::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(snapshot.phase, VisibleSessionPhase::Saved);
    assert_eq!(snapshot.record_version, Some(1));

    match room.recv().await.unwrap() {
        RoomEvent::ScoresSaved(saved) => assert_eq!(saved.team_id, fx.team_a),
        other => panic!("unexpected room event: {other:?}"),
    }

    let store = fx.state.require_score_store().await.unwrap();
    let records = store.find_records(Some(fx.team_a), bucket()).await.unwrap();
    assert_eq!(records.len(), 1);
    let entry = records[0]
        .player_scores
        .iter()
        .find(|entry| entry.player_id == fx.player_a1)
        .unwrap();
    assert_eq!(entry.average_marks, 7.5);
    assert_eq!(entry.final_score, 7.0);
    assert_eq!(records[0].scorer, "desk");
}

#[tokio::test]
async fn placeholders_survive_into_the_snapshot_but_not_the_record() {
    let fx = fixture().await;
    scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();

    let stranger = Uuid::new_v4();
    publish(&fx.state, judge_event(stranger, "Lin", JudgeType::Judge2, 9.0)).await;

    let snapshot = scoring_service::session_snapshot(&fx.state, fx.team_a, bucket())
        .await
        .unwrap();
    let entry = snapshot
        .entries
        .iter()
        .find(|entry| entry.player_id == stranger)
        .unwrap();
    assert!(entry.placeholder);
    assert_eq!(entry.player_name, "Lin");

    scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
        .await
        .unwrap();
    let store = fx.state.require_score_store().await.unwrap();
    let records = store.find_records(Some(fx.team_a), bucket()).await.unwrap();
    assert!(
        records[0]
            .player_scores
            .iter()
            .all(|entry| entry.player_id != stranger)
    );
}

#[tokio::test]
async fn locking_freezes_the_session_until_unlocked() {
    let fx = fixture().await;
    scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();
    publish(&fx.state, judge_event(fx.player_a1, "Mei", JudgeType::SeniorJudge, 8.0)).await;
    let snapshot =
        scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
            .await
            .unwrap();
    let record_id = snapshot.record_id.unwrap();

    let locked = scoring_service::set_record_lock(&fx.state, record_id, true)
        .await
        .unwrap();
    assert!(locked.is_locked);

    // The open session observed the lock and now drops every mutation.
    let snapshot = scoring_service::session_snapshot(&fx.state, fx.team_a, bucket())
        .await
        .unwrap();
    assert_eq!(snapshot.phase, VisibleSessionPhase::Locked);

    publish(&fx.state, judge_event(fx.player_a1, "Mei", JudgeType::Judge1, 9.9)).await;
    let snapshot = scoring_service::session_snapshot(&fx.state, fx.team_a, bucket())
        .await
        .unwrap();
    let entry = snapshot
        .entries
        .iter()
        .find(|entry| entry.player_id == fx.player_a1)
        .unwrap();
    assert_eq!(entry.judge_scores.judge1, 0.0);

    let err =
        scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
            .await
            .unwrap_err();
    assert!(matches!(err, ServiceError::Locked(_)));

    // Explicit unlock returns the session to an editable state.
    scoring_service::set_record_lock(&fx.state, record_id, false)
        .await
        .unwrap();
    let snapshot = scoring_service::session_snapshot(&fx.state, fx.team_a, bucket())
        .await
        .unwrap();
    assert_eq!(snapshot.phase, VisibleSessionPhase::Ready);

    scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_admin_edits_surface_as_conflicts_and_keep_the_draft() {
    let fx = fixture().await;
    scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();
    publish(&fx.state, judge_event(fx.player_a1, "Mei", JudgeType::SeniorJudge, 8.0)).await;
    scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
        .await
        .unwrap();

    // Another admin writes the record behind this session's back.
    let store = fx.state.require_score_store().await.unwrap();
    let theirs = store
        .find_records(Some(fx.team_a), bucket())
        .await
        .unwrap()
        .remove(0);
    store
        .upsert_record(theirs.clone(), Some(theirs.version))
        .await
        .unwrap();

    let err =
        scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
            .await
            .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // The draft survives the failed save and the phase is unchanged.
    let snapshot = scoring_service::session_snapshot(&fx.state, fx.team_a, bucket())
        .await
        .unwrap();
    assert_eq!(snapshot.phase, VisibleSessionPhase::Saved);
    let entry = snapshot
        .entries
        .iter()
        .find(|entry| entry.player_id == fx.player_a1)
        .unwrap();
    assert_eq!(entry.judge_scores.senior_judge, 8.0);
}

#[tokio::test]
async fn leaderboards_aggregate_across_saved_teams() {
    let fx = fixture().await;

    scoring_service::open_session(&fx.state, open_request(fx.team_a))
        .await
        .unwrap();
    publish(&fx.state, judge_event(fx.player_a1, "Mei", JudgeType::SeniorJudge, 9.0)).await;
    publish(&fx.state, judge_event(fx.player_a2, "Iris", JudgeType::SeniorJudge, 7.0)).await;
    scoring_service::save_session(&fx.state, fx.team_a, bucket(), SaveSessionRequest::default())
        .await
        .unwrap();

    scoring_service::open_session(&fx.state, open_request(fx.team_b))
        .await
        .unwrap();
    publish(&fx.state, judge_event(fx.player_b1, "Noa", JudgeType::SeniorJudge, 8.0)).await;
    scoring_service::save_session(&fx.state, fx.team_b, bucket(), SaveSessionRequest::default())
        .await
        .unwrap();

    let individuals = ranking_service::individual_rankings(
        &fx.state,
        RankingQuery {
            gender: Gender::Female,
            age_group: "u12".into(),
        },
    )
    .await
    .unwrap();

    assert_eq!(individuals.len(), 3);
    assert_eq!(individuals[0].player_name, "Mei");
    assert_eq!(individuals[0].rank, 1);
    assert_eq!(individuals[0].team_name, "Harbor");
    assert_eq!(individuals[1].player_name, "Noa");
    assert_eq!(individuals[2].player_name, "Iris");

    let teams = ranking_service::team_rankings(
        &fx.state,
        TeamRankingQuery {
            gender: Gender::Female,
            age_group: "u12".into(),
            top_n: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0].team_name, "Harbor");
    assert_eq!(teams[0].total_score, 16.0);
    assert_eq!(teams[0].counted_players, 2);
    assert_eq!(teams[1].team_name, "Summit");
    assert_eq!(teams[1].total_score, 8.0);
}
