use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{Gender, JudgeScoresEntity, JudgeType},
    dto::validation::{validate_age_group, validate_deduction, validate_mark},
    providers::Judge,
    state::{
        SessionPhase, Snapshot,
        session::{EntryEdit, PlayerDraft, ScoringSession},
    },
};

/// Session phase exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// Judges, roster, and persisted scores are being fetched.
    Loading,
    /// Draft is live and editable.
    Ready,
    /// A save is in flight.
    Saving,
    /// Draft matches a persisted record and remains editable.
    Saved,
    /// The record is locked; all mutations are disabled.
    Locked,
}

impl From<&Snapshot> for VisibleSessionPhase {
    fn from(snapshot: &Snapshot) -> Self {
        if snapshot.pending == Some(SessionPhase::Saved) {
            return VisibleSessionPhase::Saving;
        }
        match snapshot.phase {
            SessionPhase::Loading => VisibleSessionPhase::Loading,
            SessionPhase::Ready => VisibleSessionPhase::Ready,
            SessionPhase::Saved => VisibleSessionPhase::Saved,
            SessionPhase::Locked => VisibleSessionPhase::Locked,
        }
    }
}

/// Payload opening a scoring session for one team within a bucket.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct OpenSessionRequest {
    pub team_id: Uuid,
    pub gender: Gender,
    #[validate(custom(function = "validate_age_group"))]
    pub age_group: String,
}

/// Query addressing an open session by bucket.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionQuery {
    pub gender: Gender,
    pub age_group: String,
}

/// Manual edit of one draft entry: time, deductions, or a judge mark.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EntryEditRequest {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub deduction: Option<f64>,
    #[serde(default)]
    pub other_deduction: Option<f64>,
    /// Must be accompanied by `score`.
    #[serde(default)]
    pub judge_type: Option<JudgeType>,
    /// Must be accompanied by `judge_type`.
    #[serde(default)]
    pub score: Option<f64>,
}

impl Validate for EntryEditRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(deduction) = self.deduction {
            if let Err(e) = validate_deduction(deduction) {
                errors.add("deduction", e);
            }
        }
        if let Some(other_deduction) = self.other_deduction {
            if let Err(e) = validate_deduction(other_deduction) {
                errors.add("other_deduction", e);
            }
        }
        if let Some(score) = self.score {
            if let Err(e) = validate_mark(score) {
                errors.add("score", e);
            }
        }
        if self.judge_type.is_some() != self.score.is_some() {
            let mut err = validator::ValidationError::new("mark_pair");
            err.message = Some("judge_type and score must be provided together".into());
            errors.add("judge_type", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl From<EntryEditRequest> for EntryEdit {
    fn from(value: EntryEditRequest) -> Self {
        Self {
            time: value.time,
            deduction: value.deduction,
            other_deduction: value.other_deduction,
            mark: value.judge_type.zip(value.score),
        }
    }
}

/// Optional audit metadata attached to an explicit save.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SaveSessionRequest {
    #[serde(default)]
    pub time_keeper: Option<String>,
    #[serde(default)]
    pub scorer: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// One draft entry as rendered to clients.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntrySnapshot {
    pub player_id: Uuid,
    pub player_name: String,
    /// Absent for placeholders synthesized from stray live events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub placeholder: bool,
    pub time: String,
    pub judge_scores: JudgeScoresEntity,
    pub deduction: f64,
    pub other_deduction: f64,
    pub average_marks: f64,
    pub final_score: f64,
}

impl From<&PlayerDraft> for EntrySnapshot {
    fn from(draft: &PlayerDraft) -> Self {
        Self {
            player_id: draft.player_id,
            player_name: draft.player_name.clone(),
            team_id: draft.team_id,
            placeholder: draft.is_placeholder(),
            time: draft.time.clone(),
            judge_scores: draft.judge_scores.clone(),
            deduction: draft.deduction,
            other_deduction: draft.other_deduction,
            average_marks: draft.average_marks,
            final_score: draft.final_score,
        }
    }
}

/// Full view of an open scoring session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub team_id: Uuid,
    pub gender: Gender,
    pub age_group: String,
    pub phase: VisibleSessionPhase,
    /// Identity of the persisted record once one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    /// Version the draft was read from, echoed back on save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_version: Option<u64>,
    pub judges: Vec<Judge>,
    pub entries: Vec<EntrySnapshot>,
    pub time_keeper: String,
    pub scorer: String,
    pub remarks: String,
}

impl From<&ScoringSession> for SessionSnapshot {
    fn from(session: &ScoringSession) -> Self {
        Self {
            team_id: session.team_id,
            gender: session.category.gender,
            age_group: session.category.age_group.clone(),
            phase: (&session.snapshot()).into(),
            record_id: session.record_id,
            record_version: session.record_version,
            judges: session.judges.clone(),
            entries: session.entries.values().map(Into::into).collect(),
            time_keeper: session.time_keeper.clone(),
            scorer: session.scorer.clone(),
            remarks: session.remarks.clone(),
        }
    }
}
