//! HTTP client consuming the registration service's roster endpoints.

use futures::future::BoxFuture;
use uuid::Uuid;

use super::{Judge, Player, ProviderError, ProviderResult, RosterProvider, TeamRoster};
use crate::{dao::models::Category, providers::JudgeProvider};

/// Roster and judge provider backed by the registration service REST API.
#[derive(Clone)]
pub struct RosterClient {
    base_url: String,
    http: reqwest::Client,
}

impl RosterClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    async fn get_json<T>(&self, path: String) -> ProviderResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| ProviderError::unavailable(format!("GET {url}"), source))?;

        response
            .json::<T>()
            .await
            .map_err(|source| ProviderError::unavailable(format!("decoding {url}"), source))
    }
}

impl RosterProvider for RosterClient {
    fn team_players(&self, team_id: Uuid) -> BoxFuture<'static, ProviderResult<Vec<Player>>> {
        let client = self.clone();
        Box::pin(async move { client.get_json(format!("/teams/{team_id}/players")).await })
    }

    fn teams_in_category(
        &self,
        category: Category,
    ) -> BoxFuture<'static, ProviderResult<Vec<TeamRoster>>> {
        let client = self.clone();
        Box::pin(async move {
            client
                .get_json(format!(
                    "/categories/{}/{}/teams",
                    category.gender.as_str(),
                    category.age_group
                ))
                .await
        })
    }
}

impl JudgeProvider for RosterClient {
    fn judges(&self, category: Category) -> BoxFuture<'static, ProviderResult<Vec<Judge>>> {
        let client = self.clone();
        Box::pin(async move {
            client
                .get_json(format!(
                    "/categories/{}/{}/judges",
                    category.gender.as_str(),
                    category.age_group
                ))
                .await
        })
    }
}
