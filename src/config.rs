//! Application-level configuration loading, including ranking and room tuning knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCORESTREAM_BACK_CONFIG_PATH";
/// Environment variable pointing at the registration service consumed for rosters.
const ROSTER_BASE_URL_ENV: &str = "ROSTER_BASE_URL";

/// Number of individual finishers counted towards a team total by default.
const DEFAULT_TEAM_TOP_N: usize = 3;
/// Default capacity of each room broadcast channel.
const DEFAULT_ROOM_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    team_top_n: usize,
    room_capacity: usize,
    roster_base_url: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        team_top_n = config.team_top_n,
                        "loaded configuration from file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        // The roster service URL is deployment-specific, so the environment wins.
        if let Ok(url) = env::var(ROSTER_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.roster_base_url = Some(url);
            }
        }

        config
    }

    /// How many top finishers count towards a team total score.
    pub fn team_top_n(&self) -> usize {
        self.team_top_n
    }

    /// Capacity of each room broadcast channel before slow subscribers lag.
    pub fn room_capacity(&self) -> usize {
        self.room_capacity
    }

    /// Base URL of the registration service providing team/player/judge rosters.
    pub fn roster_base_url(&self) -> Option<&str> {
        self.roster_base_url.as_deref()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            team_top_n: DEFAULT_TEAM_TOP_N,
            room_capacity: DEFAULT_ROOM_CAPACITY,
            roster_base_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    team_top_n: Option<usize>,
    #[serde(default)]
    room_capacity: Option<usize>,
    #[serde(default)]
    roster_base_url: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            team_top_n: value.team_top_n.filter(|n| *n > 0).unwrap_or(defaults.team_top_n),
            room_capacity: value
                .room_capacity
                .filter(|n| *n > 0)
                .unwrap_or(defaults.room_capacity),
            roster_base_url: value.roster_base_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
