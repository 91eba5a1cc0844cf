//! Application-level configuration loading, including the strategy card set and table limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TI_TRACKER_CONFIG_PATH";

const DEFAULT_MAX_PLAYERS: usize = 8;
const DEFAULT_VICTORY_POINT_GOAL: u32 = 10;
const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Strategy card available during the strategy phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StrategyCard {
    /// Initiative number, also the action phase turn order key.
    pub number: u8,
    /// Display name.
    pub name: String,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    strategy_cards: Vec<StrategyCard>,
    max_players: usize,
    victory_point_goal: u32,
    transition_timeout: Option<Duration>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        cards = app_config.strategy_cards.len(),
                        max_players = app_config.max_players,
                        "loaded configuration"
                    );
                    app_config
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
        }
    }

    pub fn strategy_cards(&self) -> &[StrategyCard] {
        &self.strategy_cards
    }

    pub fn strategy_card(&self, number: u8) -> Option<&StrategyCard> {
        self.strategy_cards.iter().find(|card| card.number == number)
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Victory point goal applied when a game does not ask for another one.
    pub fn victory_point_goal(&self) -> u32 {
        self.victory_point_goal
    }

    /// Upper bound for a phase transition, `None` when unbounded.
    pub fn transition_timeout(&self) -> Option<Duration> {
        self.transition_timeout
    }

    #[cfg(test)]
    pub(crate) fn with_transition_timeout(mut self, limit: Option<Duration>) -> Self {
        self.transition_timeout = limit;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            strategy_cards: default_strategy_cards(),
            max_players: DEFAULT_MAX_PLAYERS,
            victory_point_goal: DEFAULT_VICTORY_POINT_GOAL,
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    strategy_cards: Option<Vec<StrategyCard>>,
    #[serde(default)]
    max_players: Option<usize>,
    #[serde(default)]
    victory_point_goal: Option<u32>,
    /// Phase transition limit in milliseconds; `0` disables the limit.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    transition_timeout_ms: Option<Duration>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let mut strategy_cards = value
            .strategy_cards
            .filter(|cards| !cards.is_empty())
            .unwrap_or(defaults.strategy_cards);
        strategy_cards.sort_by_key(|card| card.number);
        strategy_cards.dedup_by_key(|card| card.number);

        let transition_timeout = match value.transition_timeout_ms {
            Some(limit) if limit.is_zero() => None,
            Some(limit) => Some(limit),
            None => defaults.transition_timeout,
        };

        // Every seat needs a card of its own or the draft never completes.
        let mut max_players = value
            .max_players
            .filter(|max| *max > 0)
            .unwrap_or(defaults.max_players);
        if max_players > strategy_cards.len() {
            warn!(
                max_players,
                cards = strategy_cards.len(),
                "more seats than strategy cards; capping the table size"
            );
            max_players = strategy_cards.len();
        }

        Self {
            strategy_cards,
            max_players,
            victory_point_goal: value
                .victory_point_goal
                .filter(|goal| *goal > 0)
                .unwrap_or(defaults.victory_point_goal),
            transition_timeout,
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

/// Built-in strategy card set shipped with the binary.
fn default_strategy_cards() -> Vec<StrategyCard> {
    [
        (1, "Leadership"),
        (2, "Diplomacy"),
        (3, "Politics"),
        (4, "Construction"),
        (5, "Trade"),
        (6, "Warfare"),
        (7, "Technology"),
        (8, "Imperial"),
    ]
    .into_iter()
    .map(|(number, name)| StrategyCard {
        number,
        name: name.into(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig = serde_json::from_str(r#"{"max_players": 6}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.max_players(), 6);
        assert_eq!(config.strategy_cards().len(), 8);
        assert_eq!(config.transition_timeout(), Some(DEFAULT_TRANSITION_TIMEOUT));
    }

    #[test]
    fn zero_timeout_disables_the_limit() {
        let raw: RawConfig = serde_json::from_str(r#"{"transition_timeout_ms": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).transition_timeout(), None);
    }

    #[test]
    fn table_size_is_capped_by_the_card_set() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"max_players": 6, "strategy_cards": [
                {"number": 1, "name": "Leadership"},
                {"number": 2, "name": "Diplomacy"},
                {"number": 3, "name": "Politics"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(AppConfig::from(raw).max_players(), 3);

        let raw: RawConfig = serde_json::from_str(r#"{"max_players": 12}"#).unwrap();
        assert_eq!(AppConfig::from(raw).max_players(), 8);
    }

    #[test]
    fn cards_are_sorted_and_deduplicated() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"strategy_cards": [
                {"number": 3, "name": "Politics"},
                {"number": 1, "name": "Leadership"},
                {"number": 3, "name": "Politics again"}
            ]}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);
        let numbers: Vec<u8> = config.strategy_cards().iter().map(|c| c.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(config.strategy_card(3).unwrap().name, "Politics");
    }
}
