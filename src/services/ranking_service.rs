//! Query-time ranking aggregation over persisted score records.
//!
//! Both leaderboards are recomputed from the store on every request; they are
//! rendering aids, not authoritative decisions, and carry no cache.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    dao::models::{Category, ScoreRecordEntity},
    dto::ranking::{IndividualRankingEntry, RankingQuery, TeamRankingEntry, TeamRankingQuery},
    error::ServiceError,
    scoring::round2,
    state::SharedState,
};

/// Flat individual leaderboard across every team of a bucket.
pub async fn individual_rankings(
    state: &SharedState,
    query: RankingQuery,
) -> Result<Vec<IndividualRankingEntry>, ServiceError> {
    let category = Category::new(query.gender, query.age_group);
    let store = state.require_score_store().await?;
    let records = store.find_records(None, category.clone()).await?;
    let team_names = team_names(state, category).await?;
    Ok(rank_individuals(&records, &team_names))
}

/// Team leaderboard computed from each team's top-N finishers.
pub async fn team_rankings(
    state: &SharedState,
    query: TeamRankingQuery,
) -> Result<Vec<TeamRankingEntry>, ServiceError> {
    let top_n = query
        .top_n
        .filter(|n| *n > 0)
        .unwrap_or_else(|| state.config().team_top_n());
    let category = Category::new(query.gender, query.age_group);
    let store = state.require_score_store().await?;
    let records = store.find_records(None, category.clone()).await?;
    let team_names = team_names(state, category).await?;
    Ok(rank_teams(&records, &team_names, top_n))
}

async fn team_names(
    state: &SharedState,
    category: Category,
) -> Result<HashMap<Uuid, String>, ServiceError> {
    let teams = state.roster().teams_in_category(category).await?;
    Ok(teams.into_iter().map(|team| (team.id, team.name)).collect())
}

/// Flatten every scored entry of the bucket and rank descending by final score.
///
/// Ties break deterministically by player name, then id, so the board renders
/// identically across re-fetches.
pub fn rank_individuals(
    records: &[ScoreRecordEntity],
    team_names: &HashMap<Uuid, String>,
) -> Vec<IndividualRankingEntry> {
    let mut rows: Vec<IndividualRankingEntry> = records
        .iter()
        .flat_map(|record| {
            record
                .player_scores
                .iter()
                .filter(|entry| entry.is_scored())
                .map(|entry| IndividualRankingEntry {
                    rank: 0,
                    player_id: entry.player_id,
                    player_name: entry.player_name.clone(),
                    team_id: record.team_id,
                    team_name: team_names.get(&record.team_id).cloned().unwrap_or_default(),
                    final_score: entry.final_score,
                })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then_with(|| a.player_name.cmp(&b.player_name))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    rows
}

/// Rank teams by the sum of their top `top_n` individual final scores.
///
/// A team with fewer scored players counts all of them; a team with none is
/// left off the board entirely.
pub fn rank_teams(
    records: &[ScoreRecordEntity],
    team_names: &HashMap<Uuid, String>,
    top_n: usize,
) -> Vec<TeamRankingEntry> {
    let mut rows: Vec<TeamRankingEntry> = records
        .iter()
        .filter_map(|record| {
            let mut finals: Vec<f64> = record
                .player_scores
                .iter()
                .filter(|entry| entry.is_scored())
                .map(|entry| entry.final_score)
                .collect();
            if finals.is_empty() {
                return None;
            }

            finals.sort_by(|a, b| b.total_cmp(a));
            finals.truncate(top_n);

            let counted_players = finals.len();
            let total_score = round2(finals.iter().sum());
            Some(TeamRankingEntry {
                rank: 0,
                team_id: record.team_id,
                team_name: team_names.get(&record.team_id).cloned().unwrap_or_default(),
                counted_players,
                total_score,
                average_score: round2(total_score / counted_players as f64),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_score
            .total_cmp(&a.total_score)
            .then_with(|| a.team_name.cmp(&b.team_name))
            .then_with(|| a.team_id.cmp(&b.team_id))
    });
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{Gender, PlayerScoreEntity};
    use crate::scoring;

    fn bucket() -> Category {
        Category::new(Gender::Male, "u18")
    }

    fn scored_entry(name: &str, senior: f64, deduction: f64) -> PlayerScoreEntity {
        let mut entry = PlayerScoreEntity::new(Uuid::new_v4(), name.into());
        entry.judge_scores.senior_judge = senior;
        entry.deduction = deduction;
        scoring::recompute(&mut entry);
        entry
    }

    fn record_with(entries: Vec<PlayerScoreEntity>) -> ScoreRecordEntity {
        let mut record = ScoreRecordEntity::new(Uuid::new_v4(), bucket());
        record.player_scores = entries;
        record
    }

    fn names(records: &[ScoreRecordEntity]) -> HashMap<Uuid, String> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.team_id, format!("team-{index}")))
            .collect()
    }

    #[test]
    fn individual_ranks_are_unique_and_contiguous() {
        let records = vec![
            record_with(vec![
                scored_entry("ana", 9.0, 0.0),
                scored_entry("bo", 7.0, 0.0),
                PlayerScoreEntity::new(Uuid::new_v4(), "never scored".into()),
            ]),
            record_with(vec![scored_entry("cy", 8.0, 0.0)]),
        ];

        let rows = rank_individuals(&records, &names(&records));

        // Unscored entries are absent; everyone else appears exactly once.
        assert_eq!(rows.len(), 3);
        let ranks: Vec<usize> = rows.iter().map(|row| row.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(rows[0].player_name, "ana");
        assert_eq!(rows[1].player_name, "cy");
    }

    #[test]
    fn ties_break_by_player_name_then_id() {
        let records = vec![record_with(vec![
            scored_entry("zoe", 8.0, 0.0),
            scored_entry("abe", 8.0, 0.0),
        ])];

        let rows = rank_individuals(&records, &names(&records));
        assert_eq!(rows[0].player_name, "abe");
        assert_eq!(rows[1].player_name, "zoe");
    }

    #[test]
    fn team_totals_sum_the_top_n_final_scores() {
        let records = vec![record_with(vec![
            scored_entry("a", 9.0, 0.0),
            scored_entry("b", 8.0, 0.0),
            scored_entry("c", 7.0, 0.0),
            scored_entry("d", 6.0, 0.0),
        ])];

        let rows = rank_teams(&records, &names(&records), 3);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].counted_players, 3);
        assert_eq!(rows[0].total_score, 24.0);
        assert_eq!(rows[0].average_score, 8.0);
    }

    #[test]
    fn short_handed_teams_average_over_what_they_have() {
        let records = vec![
            record_with(vec![scored_entry("solo", 9.0, 0.5)]),
            record_with(vec![]),
        ];

        let rows = rank_teams(&records, &names(&records), 3);
        // The empty record never makes the board.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].counted_players, 1);
        assert_eq!(rows[0].total_score, 8.5);
        assert_eq!(rows[0].average_score, 8.5);
    }

    #[test]
    fn teams_sort_descending_by_total() {
        let records = vec![
            record_with(vec![scored_entry("a", 7.0, 0.0)]),
            record_with(vec![scored_entry("b", 9.0, 0.0)]),
        ];
        let team_names = names(&records);

        let rows = rank_teams(&records, &team_names, 3);
        assert_eq!(rows[0].total_score, 9.0);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].total_score, 7.0);
        assert_eq!(rows[1].rank, 2);
    }
}
