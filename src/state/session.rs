use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dao::models::{Category, JudgeScoresEntity, JudgeType, PlayerScoreEntity, ScoreRecordEntity},
    dto::ws::ScoreUpdateBroadcast,
    providers::{Judge, Player, TeamRoster},
    scoring,
    state::state_machine::{
        AbortError, ApplyError, Plan, PlanError, PlanId, SessionEvent, SessionPhase,
        SessionStateMachine, Snapshot,
    },
};

/// Errors raised by draft mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// The session observed the persisted record as locked.
    #[error("scoring session is locked")]
    Locked,
    /// Manual edits may only target players already present in the draft.
    #[error("player `{0}` is not part of this draft")]
    UnknownPlayer(Uuid),
}

/// Manual edit applied to a single draft entry.
#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub time: Option<String>,
    pub deduction: Option<f64>,
    pub other_deduction: Option<f64>,
    /// Judge slot plus mark, entered at the scoring desk on a judge's behalf.
    pub mark: Option<(JudgeType, f64)>,
}

/// How a live score event was absorbed by the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveMergeOutcome {
    /// The event mutated an existing entry.
    Applied,
    /// The player was unknown; a placeholder entry was synthesized.
    Synthesized,
    /// The session is locked and dropped the event.
    IgnoredLocked,
}

/// One player's scores inside the in-memory draft.
///
/// Unlike the persisted entry this tracks the owning team, because the draft
/// also carries cross-team entries for live viewing and placeholders
/// synthesized from stray events.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDraft {
    pub player_id: Uuid,
    pub player_name: String,
    /// `None` for placeholders not yet reconciled against the roster.
    pub team_id: Option<Uuid>,
    pub time: String,
    pub judge_scores: JudgeScoresEntity,
    pub deduction: f64,
    pub other_deduction: f64,
    pub average_marks: f64,
    pub final_score: f64,
}

impl PlayerDraft {
    fn from_roster(player: &Player, team_id: Uuid) -> Self {
        Self {
            player_id: player.id,
            player_name: player.name.clone(),
            team_id: Some(team_id),
            time: String::new(),
            judge_scores: JudgeScoresEntity::default(),
            deduction: 0.0,
            other_deduction: 0.0,
            average_marks: 0.0,
            final_score: 0.0,
        }
    }

    /// Minimal entry synthesized for a live event naming an unknown player.
    fn placeholder(player_id: Uuid, player_name: String) -> Self {
        Self {
            player_id,
            player_name,
            team_id: None,
            time: String::new(),
            judge_scores: JudgeScoresEntity::default(),
            deduction: 0.0,
            other_deduction: 0.0,
            average_marks: 0.0,
            final_score: 0.0,
        }
    }

    /// Whether this entry was synthesized and still awaits roster reconciliation.
    pub fn is_placeholder(&self) -> bool {
        self.team_id.is_none()
    }

    fn absorb_persisted(&mut self, entity: &PlayerScoreEntity) {
        self.player_name = entity.player_name.clone();
        self.time = entity.time.clone();
        self.judge_scores = entity.judge_scores.clone();
        self.deduction = entity.deduction;
        self.other_deduction = entity.other_deduction;
        self.recompute();
    }

    fn to_entity(&self) -> PlayerScoreEntity {
        let mut entity = PlayerScoreEntity {
            player_id: self.player_id,
            player_name: self.player_name.clone(),
            time: self.time.clone(),
            judge_scores: self.judge_scores.clone(),
            deduction: self.deduction,
            other_deduction: self.other_deduction,
            average_marks: 0.0,
            final_score: 0.0,
        };
        scoring::recompute(&mut entity);
        entity
    }

    fn recompute(&mut self) {
        self.average_marks = scoring::average_marks(&self.judge_scores);
        self.final_score =
            scoring::final_score(self.average_marks, self.deduction, self.other_deduction);
    }
}

/// Server-hosted scoring session for one team within one bucket.
///
/// Holds the mutable draft that live events and manual edits converge on
/// until an explicit save persists it.
pub struct ScoringSession {
    pub team_id: Uuid,
    pub category: Category,
    /// Scoring panel for the bucket, empty-name judges already filtered out.
    pub judges: Vec<Judge>,
    /// Draft entries keyed by player, own team first, then the rest of the
    /// bucket for cross-team live viewing.
    pub entries: IndexMap<Uuid, PlayerDraft>,
    /// Identity of the persisted record once one exists.
    pub record_id: Option<Uuid>,
    /// Version of the persisted record this draft was read from.
    pub record_version: Option<u64>,
    pub time_keeper: String,
    pub scorer: String,
    pub remarks: String,
    machine: SessionStateMachine,
}

impl ScoringSession {
    /// Fresh session in the loading phase.
    pub fn new(team_id: Uuid, category: Category) -> Self {
        Self {
            team_id,
            category,
            judges: Vec::new(),
            entries: IndexMap::new(),
            record_id: None,
            record_version: None,
            time_keeper: String::new(),
            scorer: String::new(),
            remarks: String::new(),
            machine: SessionStateMachine::new(),
        }
    }

    /// Complete the loading phase with rosters and any persisted record.
    ///
    /// The own team's players come first in draft order; the rest of the
    /// bucket follows so dashboards can watch every routine live. Persisted
    /// marks overwrite blank roster entries, and a record already reporting
    /// `is_locked` sends the session straight to the locked phase.
    pub fn hydrate(
        &mut self,
        judges: Vec<Judge>,
        teams: Vec<TeamRoster>,
        existing: Option<ScoreRecordEntity>,
    ) -> Result<SessionPhase, PlanError> {
        self.judges = judges;

        let (own, others): (Vec<_>, Vec<_>) =
            teams.into_iter().partition(|team| team.id == self.team_id);
        for team in own.iter().chain(others.iter()) {
            for player in &team.players {
                match self.entries.entry(player.id) {
                    indexmap::map::Entry::Occupied(mut slot) => {
                        // Reconcile a placeholder against the authoritative roster.
                        let draft = slot.get_mut();
                        draft.player_name = player.name.clone();
                        draft.team_id = Some(team.id);
                    }
                    indexmap::map::Entry::Vacant(slot) => {
                        slot.insert(PlayerDraft::from_roster(player, team.id));
                    }
                }
            }
        }

        let mut locked = false;
        if let Some(record) = existing {
            locked = record.is_locked;
            self.record_id = Some(record.id);
            self.record_version = Some(record.version);
            self.time_keeper = record.time_keeper.clone();
            self.scorer = record.scorer.clone();
            self.remarks = record.remarks.clone();

            for entity in &record.player_scores {
                match self.entries.entry(entity.player_id) {
                    indexmap::map::Entry::Occupied(mut slot) => {
                        slot.get_mut().absorb_persisted(entity);
                    }
                    indexmap::map::Entry::Vacant(slot) => {
                        // Persisted entries always belong to the own team.
                        let mut draft =
                            PlayerDraft::placeholder(entity.player_id, entity.player_name.clone());
                        draft.team_id = Some(record.team_id);
                        draft.absorb_persisted(entity);
                        slot.insert(draft);
                    }
                }
            }
        }

        if locked {
            self.machine.transition(SessionEvent::LockObserved)
        } else {
            self.machine.transition(SessionEvent::RosterLoaded)
        }
    }

    /// Merge a live score event into the draft.
    pub fn apply_live(&mut self, update: &ScoreUpdateBroadcast) -> LiveMergeOutcome {
        if !self.machine.accepts_mutations() {
            return LiveMergeOutcome::IgnoredLocked;
        }

        let outcome = if self.entries.contains_key(&update.player_id) {
            LiveMergeOutcome::Applied
        } else {
            LiveMergeOutcome::Synthesized
        };

        let draft = self.entries.entry(update.player_id).or_insert_with(|| {
            PlayerDraft::placeholder(update.player_id, update.player_name.clone())
        });
        *draft.judge_scores.slot_mut(update.judge_type) = update.score;
        draft.recompute();

        outcome
    }

    /// Apply a manual edit to one entry.
    pub fn edit_entry(
        &mut self,
        player_id: Uuid,
        edit: EntryEdit,
    ) -> Result<&PlayerDraft, DraftError> {
        if !self.machine.accepts_mutations() {
            return Err(DraftError::Locked);
        }

        let draft = self
            .entries
            .get_mut(&player_id)
            .ok_or(DraftError::UnknownPlayer(player_id))?;

        if let Some(time) = edit.time {
            draft.time = time;
        }
        if let Some(deduction) = edit.deduction {
            draft.deduction = deduction;
        }
        if let Some(other_deduction) = edit.other_deduction {
            draft.other_deduction = other_deduction;
        }
        if let Some((judge_type, score)) = edit.mark {
            *draft.judge_scores.slot_mut(judge_type) = score;
        }
        draft.recompute();

        Ok(draft)
    }

    /// Update the audit metadata attached to the record on save.
    pub fn set_audit(
        &mut self,
        time_keeper: Option<String>,
        scorer: Option<String>,
        remarks: Option<String>,
    ) -> Result<(), DraftError> {
        if !self.machine.accepts_mutations() {
            return Err(DraftError::Locked);
        }

        if let Some(time_keeper) = time_keeper {
            self.time_keeper = time_keeper;
        }
        if let Some(scorer) = scorer {
            self.scorer = scorer;
        }
        if let Some(remarks) = remarks {
            self.remarks = remarks;
        }
        Ok(())
    }

    /// Serialize the draft into the record persisted for this team.
    ///
    /// Cross-team viewing entries and unreconciled placeholders are not part
    /// of this team's record and are left behind.
    pub fn to_record(&self) -> ScoreRecordEntity {
        let mut record = ScoreRecordEntity::new(self.team_id, self.category.clone());
        if let Some(id) = self.record_id {
            record.id = id;
        }
        record.time_keeper = self.time_keeper.clone();
        record.scorer = self.scorer.clone();
        record.remarks = self.remarks.clone();
        record.player_scores = self
            .entries
            .values()
            .filter(|draft| draft.team_id == Some(self.team_id))
            .map(PlayerDraft::to_entity)
            .collect();
        record
    }

    /// Adopt the identity and version of the record returned by a save.
    pub fn adopt_saved(&mut self, stored: &ScoreRecordEntity) {
        self.record_id = Some(stored.id);
        self.record_version = Some(stored.version);
    }

    /// Current phase of the session.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Snapshot of the session state machine, pending transition included.
    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    /// Plan the save transition; the draft is persisted between plan and apply.
    pub fn plan_save(&mut self) -> Result<Plan, PlanError> {
        self.machine.plan(SessionEvent::Save)
    }

    /// Commit a planned transition.
    pub fn apply_transition(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        self.machine.apply(plan_id)
    }

    /// Roll back a planned transition, leaving phase and draft untouched.
    pub fn abort_transition(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        self.machine.abort(plan_id)
    }

    /// React to the persisted record being locked by an admin.
    pub fn observe_lock(&mut self) -> Result<SessionPhase, PlanError> {
        self.machine.transition(SessionEvent::LockObserved)
    }

    /// React to the persisted record being unlocked by an admin.
    pub fn observe_unlock(&mut self) -> Result<SessionPhase, PlanError> {
        self.machine.transition(SessionEvent::Unlock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::Gender;

    fn bucket() -> Category {
        Category::new(Gender::Female, "u15")
    }

    fn roster_player(team_id: Uuid, name: &str) -> Player {
        Player {
            id: Uuid::new_v4(),
            name: name.into(),
            team_id,
        }
    }

    fn ready_session() -> (ScoringSession, Uuid, Uuid) {
        let team_id = Uuid::new_v4();
        let rival_id = Uuid::new_v4();
        let own_player = roster_player(team_id, "Mei");
        let rival_player = roster_player(rival_id, "Noa");
        let own_player_id = own_player.id;

        let mut session = ScoringSession::new(team_id, bucket());
        let phase = session
            .hydrate(
                Vec::new(),
                vec![
                    TeamRoster {
                        id: rival_id,
                        name: "Rivals".into(),
                        players: vec![rival_player],
                    },
                    TeamRoster {
                        id: team_id,
                        name: "Own".into(),
                        players: vec![own_player],
                    },
                ],
                None,
            )
            .unwrap();
        assert_eq!(phase, SessionPhase::Ready);
        (session, team_id, own_player_id)
    }

    fn update(player_id: Uuid, name: &str, judge_type: JudgeType, score: f64) -> ScoreUpdateBroadcast {
        ScoreUpdateBroadcast {
            room: bucket().room_id(),
            player_id,
            player_name: name.into(),
            judge_type,
            score,
        }
    }

    #[test]
    fn own_team_entries_come_first_in_draft_order() {
        let (session, team_id, _) = ready_session();
        let first = session.entries.values().next().unwrap();
        assert_eq!(first.team_id, Some(team_id));
    }

    #[test]
    fn live_updates_mutate_the_matching_slot() {
        let (mut session, _, player_id) = ready_session();

        let outcome = session.apply_live(&update(player_id, "Mei", JudgeType::Judge1, 7.5));
        assert_eq!(outcome, LiveMergeOutcome::Applied);

        let draft = &session.entries[&player_id];
        assert_eq!(draft.judge_scores.judge1, 7.5);
        assert_eq!(draft.average_marks, 7.5);
    }

    #[test]
    fn a_fast_double_submit_is_last_write_wins_per_slot() {
        let (mut session, _, player_id) = ready_session();

        session.apply_live(&update(player_id, "Mei", JudgeType::Judge3, 6.0));
        session.apply_live(&update(player_id, "Mei", JudgeType::Judge3, 8.0));

        assert_eq!(session.entries[&player_id].judge_scores.judge3, 8.0);
    }

    #[test]
    fn unknown_players_get_exactly_one_placeholder_entry() {
        let (mut session, _, _) = ready_session();
        let stranger = Uuid::new_v4();
        let before = session.entries.len();

        let outcome = session.apply_live(&update(stranger, "Lin", JudgeType::SeniorJudge, 9.0));
        assert_eq!(outcome, LiveMergeOutcome::Synthesized);
        assert_eq!(session.entries.len(), before + 1);

        let draft = &session.entries[&stranger];
        assert_eq!(draft.player_name, "Lin");
        assert!(draft.is_placeholder());
        assert_eq!(draft.judge_scores.senior_judge, 9.0);
        assert_eq!(draft.judge_scores.judge1, 0.0);
    }

    #[test]
    fn locked_sessions_drop_live_updates_entirely() {
        let (mut session, _, player_id) = ready_session();
        session.observe_lock().unwrap();

        let outcome = session.apply_live(&update(player_id, "Mei", JudgeType::Judge2, 5.0));
        assert_eq!(outcome, LiveMergeOutcome::IgnoredLocked);
        assert_eq!(session.entries[&player_id].judge_scores.judge2, 0.0);

        let err = session
            .edit_entry(player_id, EntryEdit::default())
            .unwrap_err();
        assert_eq!(err, DraftError::Locked);
    }

    #[test]
    fn manual_edits_recompute_derived_fields() {
        let (mut session, _, player_id) = ready_session();
        session.apply_live(&update(player_id, "Mei", JudgeType::Judge1, 8.0));

        let draft = session
            .edit_entry(
                player_id,
                EntryEdit {
                    deduction: Some(0.5),
                    ..EntryEdit::default()
                },
            )
            .unwrap();
        assert_eq!(draft.final_score, 7.5);

        let err = session
            .edit_entry(Uuid::new_v4(), EntryEdit::default())
            .unwrap_err();
        assert!(matches!(err, DraftError::UnknownPlayer(_)));
    }

    #[test]
    fn to_record_keeps_own_team_entries_only() {
        let (mut session, team_id, player_id) = ready_session();
        session.apply_live(&update(player_id, "Mei", JudgeType::Judge1, 8.0));
        session.apply_live(&update(Uuid::new_v4(), "Lin", JudgeType::Judge1, 9.0));

        let record = session.to_record();
        assert_eq!(record.team_id, team_id);
        assert_eq!(record.player_scores.len(), 1);
        assert_eq!(record.player_scores[0].player_id, player_id);
        assert_eq!(record.player_scores[0].final_score, 8.0);
    }

    #[test]
    fn hydrate_merges_persisted_marks_and_observes_locks() {
        let team_id = Uuid::new_v4();
        let player = roster_player(team_id, "Mei");
        let player_id = player.id;

        let mut record = ScoreRecordEntity::new(team_id, bucket());
        let mut entity = PlayerScoreEntity::new(player_id, "Mei".into());
        entity.judge_scores.senior_judge = 8.0;
        entity.deduction = 1.0;
        record.player_scores.push(entity);
        record.is_locked = true;
        record.version = 3;

        let mut session = ScoringSession::new(team_id, bucket());
        let phase = session
            .hydrate(
                Vec::new(),
                vec![TeamRoster {
                    id: team_id,
                    name: "Own".into(),
                    players: vec![player],
                }],
                Some(record),
            )
            .unwrap();

        assert_eq!(phase, SessionPhase::Locked);
        assert_eq!(session.record_version, Some(3));
        let draft = &session.entries[&player_id];
        assert_eq!(draft.average_marks, 8.0);
        assert_eq!(draft.final_score, 7.0);
    }
}
