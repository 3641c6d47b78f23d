//! External collaborator interfaces consumed by the scoring core.
//!
//! Team/player registration and judge management live in another system; the
//! scoring core only reads their rosters through these traits.

#[cfg(feature = "http-roster")]
pub mod http;

use std::error::Error;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{Category, JudgeType};

/// Result alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error raised when a collaborator service cannot be consulted.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("roster service unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl ProviderError {
    /// Construct an unavailable error from any transport failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        ProviderError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// A player eligible to compete for a team in some category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub team_id: Uuid,
}

/// A team with its players assigned to the queried category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TeamRoster {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<Player>,
}

/// A judge assigned to score a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Judge {
    pub judge_no: u8,
    pub judge_type: JudgeType,
    pub name: String,
    pub username: String,
}

/// Read access to team and player assignments.
pub trait RosterProvider: Send + Sync {
    /// Players registered for one team.
    fn team_players(&self, team_id: Uuid) -> BoxFuture<'static, ProviderResult<Vec<Player>>>;
    /// Every team competing in a category, players embedded.
    fn teams_in_category(
        &self,
        category: Category,
    ) -> BoxFuture<'static, ProviderResult<Vec<TeamRoster>>>;
}

/// Read access to judge assignments per category.
pub trait JudgeProvider: Send + Sync {
    fn judges(&self, category: Category) -> BoxFuture<'static, ProviderResult<Vec<Judge>>>;
}

/// Fixed roster used by tests and as a fallback when no roster service is
/// configured.
#[derive(Clone, Default)]
pub struct StaticRoster {
    teams: Vec<(Category, TeamRoster)>,
    judges: Vec<(Category, Judge)>,
}

impl StaticRoster {
    /// Register a team (and its players) under a category.
    pub fn with_team(mut self, category: Category, team: TeamRoster) -> Self {
        self.teams.push((category, team));
        self
    }

    /// Register a judge under a category.
    pub fn with_judge(mut self, category: Category, judge: Judge) -> Self {
        self.judges.push((category, judge));
        self
    }
}

impl RosterProvider for StaticRoster {
    fn team_players(&self, team_id: Uuid) -> BoxFuture<'static, ProviderResult<Vec<Player>>> {
        let players = self
            .teams
            .iter()
            .filter(|(_, team)| team.id == team_id)
            .flat_map(|(_, team)| team.players.clone())
            .collect();
        Box::pin(async move { Ok(players) })
    }

    fn teams_in_category(
        &self,
        category: Category,
    ) -> BoxFuture<'static, ProviderResult<Vec<TeamRoster>>> {
        let teams = self
            .teams
            .iter()
            .filter(|(team_category, _)| *team_category == category)
            .map(|(_, team)| team.clone())
            .collect();
        Box::pin(async move { Ok(teams) })
    }
}

impl JudgeProvider for StaticRoster {
    fn judges(&self, category: Category) -> BoxFuture<'static, ProviderResult<Vec<Judge>>> {
        let judges = self
            .judges
            .iter()
            .filter(|(judge_category, _)| *judge_category == category)
            .map(|(_, judge)| judge.clone())
            .collect();
        Box::pin(async move { Ok(judges) })
    }
}
