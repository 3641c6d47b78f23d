//! Trimmed-mean score aggregation.
//!
//! Every component that displays or persists a mark goes through this module,
//! so the live draft preview and the persisted record can never disagree.

use crate::dao::models::{JudgeScoresEntity, PlayerScoreEntity};

/// Round a mark to two decimal places for display and persistence.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average the contributing judge marks of an entry.
///
/// A slot contributes only when its value is strictly greater than zero; a
/// stored `0.0` means "not yet scored". With four or five contributing marks
/// the single lowest and single highest are discarded before averaging.
pub fn average_marks(judge_scores: &JudgeScoresEntity) -> f64 {
    let mut contributing: Vec<f64> = judge_scores
        .marks()
        .into_iter()
        .filter(|mark| *mark > 0.0)
        .collect();

    match contributing.len() {
        0 => 0.0,
        1..=3 => round2(mean(&contributing)),
        _ => {
            contributing.sort_by(f64::total_cmp);
            round2(mean(&contributing[1..contributing.len() - 1]))
        }
    }
}

/// Combine an average with the two deduction tracks into a final score.
///
/// The result is clamped at zero: deductions can wipe out a routine but never
/// drive the score negative.
pub fn final_score(average: f64, deduction: f64, other_deduction: f64) -> f64 {
    round2(average - deduction - other_deduction).max(0.0)
}

/// Recompute the derived fields of an entry in place after any mutation.
pub fn recompute(entry: &mut PlayerScoreEntity) {
    entry.average_marks = average_marks(&entry.judge_scores);
    entry.final_score = final_score(entry.average_marks, entry.deduction, entry.other_deduction);
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
