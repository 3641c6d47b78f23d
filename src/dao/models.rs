use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Competition gender bracket, half of the bucket identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Stable lowercase name used in room identifiers and storage filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// A (gender, age-group) bucket scoping rooms, rankings, and judge rosters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub gender: Gender,
    /// Free-form bracket label, e.g. `u12`.
    pub age_group: String,
}

impl Category {
    pub fn new(gender: Gender, age_group: impl Into<String>) -> Self {
        Self {
            gender,
            age_group: age_group.into(),
        }
    }

    /// Room naming convention owned by the scoring core.
    pub fn room_id(&self) -> String {
        format!("scoring_{}_{}", self.gender.as_str(), self.age_group)
    }
}

/// One of the five fixed judge roles contributing a mark per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JudgeType {
    SeniorJudge,
    Judge1,
    Judge2,
    Judge3,
    Judge4,
}

impl JudgeType {
    /// All slots in panel order.
    pub const ALL: [JudgeType; 5] = [
        JudgeType::SeniorJudge,
        JudgeType::Judge1,
        JudgeType::Judge2,
        JudgeType::Judge3,
        JudgeType::Judge4,
    ];
}

/// The five fixed judge slots of one player entry.
///
/// A value of `0.0` means the slot has not been scored yet; a legitimate mark
/// of exactly zero cannot be recorded (inherited business rule).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JudgeScoresEntity {
    #[serde(default)]
    pub senior_judge: f64,
    #[serde(default)]
    pub judge1: f64,
    #[serde(default)]
    pub judge2: f64,
    #[serde(default)]
    pub judge3: f64,
    #[serde(default)]
    pub judge4: f64,
}

impl JudgeScoresEntity {
    /// Read the mark held by a slot.
    pub fn slot(&self, judge_type: JudgeType) -> f64 {
        match judge_type {
            JudgeType::SeniorJudge => self.senior_judge,
            JudgeType::Judge1 => self.judge1,
            JudgeType::Judge2 => self.judge2,
            JudgeType::Judge3 => self.judge3,
            JudgeType::Judge4 => self.judge4,
        }
    }

    /// Mutable access to the slot owned by a judge role.
    pub fn slot_mut(&mut self, judge_type: JudgeType) -> &mut f64 {
        match judge_type {
            JudgeType::SeniorJudge => &mut self.senior_judge,
            JudgeType::Judge1 => &mut self.judge1,
            JudgeType::Judge2 => &mut self.judge2,
            JudgeType::Judge3 => &mut self.judge3,
            JudgeType::Judge4 => &mut self.judge4,
        }
    }

    /// All five marks in panel order, unset slots included as `0.0`.
    pub fn marks(&self) -> [f64; 5] {
        [
            self.senior_judge,
            self.judge1,
            self.judge2,
            self.judge3,
            self.judge4,
        ]
    }
}

/// One player's scores inside a score record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlayerScoreEntity {
    /// Player identity within the roster service.
    pub player_id: Uuid,
    /// Display name, denormalized so dashboards render without roster lookups.
    pub player_name: String,
    /// Routine duration as entered by the timekeeper; not used in scoring math.
    #[serde(default)]
    pub time: String,
    /// Marks per judge slot.
    #[serde(default)]
    pub judge_scores: JudgeScoresEntity,
    /// Time-rule penalty.
    #[serde(default)]
    pub deduction: f64,
    /// Other/execution penalty, tracked independently.
    #[serde(default)]
    pub other_deduction: f64,
    /// Derived trimmed mean of the contributing marks.
    #[serde(default)]
    pub average_marks: f64,
    /// Derived `max(0, average_marks - deduction - other_deduction)`.
    #[serde(default)]
    pub final_score: f64,
}

impl PlayerScoreEntity {
    /// Blank entry for a player that has not been scored yet.
    pub fn new(player_id: Uuid, player_name: String) -> Self {
        Self {
            player_id,
            player_name,
            time: String::new(),
            judge_scores: JudgeScoresEntity::default(),
            deduction: 0.0,
            other_deduction: 0.0,
            average_marks: 0.0,
            final_score: 0.0,
        }
    }

    /// Whether at least one judge slot holds a contributing mark.
    pub fn is_scored(&self) -> bool {
        self.judge_scores.marks().iter().any(|mark| *mark > 0.0)
    }
}

/// The persisted, lockable aggregate of all player scores for one team within
/// one (gender, age-group) bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecordEntity {
    /// Primary key of the record.
    pub id: Uuid,
    /// Owning team; together with `category` forms the unique triple.
    pub team_id: Uuid,
    /// Bucket this record belongs to.
    pub category: Category,
    /// Per-player entries, unique by `player_id`.
    pub player_scores: Vec<PlayerScoreEntity>,
    /// Audit: who kept time for this team.
    #[serde(default)]
    pub time_keeper: String,
    /// Audit: who operated the scoring desk.
    #[serde(default)]
    pub scorer: String,
    /// Free-text remarks.
    #[serde(default)]
    pub remarks: String,
    /// When set, every mutation except an explicit unlock is rejected.
    #[serde(default)]
    pub is_locked: bool,
    /// Optimistic concurrency counter, bumped on every successful write.
    #[serde(default)]
    pub version: u64,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last mutation timestamp.
    pub updated_at: SystemTime,
}

impl ScoreRecordEntity {
    /// Fresh unsaved record for a (team, category) pair.
    pub fn new(team_id: Uuid, category: Category) -> Self {
        let timestamp = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            team_id,
            category,
            player_scores: Vec::new(),
            time_keeper: String::new(),
            scorer: String::new(),
            remarks: String::new(),
            is_locked: false,
            version: 0,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_follows_the_naming_convention() {
        let category = Category::new(Gender::Female, "u12");
        assert_eq!(category.room_id(), "scoring_female_u12");
    }

    #[test]
    fn judge_types_serialize_to_slot_names() {
        let json = serde_json::to_string(&JudgeType::SeniorJudge).unwrap();
        assert_eq!(json, "\"senior_judge\"");
        let json = serde_json::to_string(&JudgeType::Judge3).unwrap();
        assert_eq!(json, "\"judge3\"");
    }

    #[test]
    fn slot_accessors_cover_every_judge_type() {
        let mut scores = JudgeScoresEntity::default();
        for (index, judge_type) in JudgeType::ALL.into_iter().enumerate() {
            *scores.slot_mut(judge_type) = index as f64 + 1.0;
        }
        assert_eq!(scores.marks(), [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(scores.slot(JudgeType::Judge4), 5.0);
    }

    #[test]
    fn unscored_entries_are_detected() {
        let mut entry = PlayerScoreEntity::new(Uuid::new_v4(), "p".into());
        assert!(!entry.is_scored());
        entry.judge_scores.judge2 = 6.5;
        assert!(entry.is_scored());
    }
}
