//! Simulator configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use memory_game::{GameConfig, GameSpeed, Theme, Timings, constants};
use std::time::Duration;

/// Complete simulator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Configuration shared by every simulated game
    pub game: GameConfig,
    /// Score check and robot delays
    pub timings: Timings,
    /// Rounds played per game (restarting in between)
    pub rounds: u32,
    /// Number of games played concurrently
    pub games: usize,
    /// Seed for boards and robots; random when absent
    pub seed: Option<u64>,
}

/// Values given on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub size: Option<usize>,
    pub players: Option<usize>,
    pub rounds: Option<u32>,
    pub games: Option<usize>,
    pub seed: Option<u64>,
}

impl SimConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values from CLI args
    ///
    /// # Returns
    ///
    /// * `Result<SimConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a theme, speed or seed variable cannot be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let theme = parse_env_with("SIM_THEME", Theme::Numeric)?;
        let speed = parse_env_with("SIM_SPEED", GameSpeed::Normal)?;

        let game = GameConfig {
            size: overrides
                .size
                .unwrap_or_else(|| parse_env_or("SIM_BOARD_SIZE", constants::DEFAULT_BOARD_SIZE)),
            theme,
            player_count: overrides
                .players
                .unwrap_or_else(|| parse_env_or("SIM_PLAYERS", constants::DEFAULT_PLAYERS)),
            speed,
            with_agents: true,
        };

        let timings = Timings {
            normal_score_delay: Duration::from_millis(parse_env_or(
                "SCORE_DELAY_NORMAL_MS",
                constants::DEFAULT_NORMAL_SCORE_DELAY_MS,
            )),
            relaxing_score_delay: Duration::from_millis(parse_env_or(
                "SCORE_DELAY_RELAXING_MS",
                constants::DEFAULT_RELAXING_SCORE_DELAY_MS,
            )),
            agent_action_delay: Duration::from_millis(parse_env_or(
                "AGENT_ACTION_DELAY_MS",
                constants::DEFAULT_AGENT_ACTION_DELAY_MS,
            )),
        };

        let seed = match overrides.seed {
            Some(seed) => Some(seed),
            None => match std::env::var("SIM_SEED") {
                Ok(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SIM_SEED".to_string(),
                    reason: format!("'{raw}' is not an unsigned integer"),
                })?),
                Err(_) => None,
            },
        };

        Ok(SimConfig {
            game,
            timings,
            rounds: overrides
                .rounds
                .unwrap_or_else(|| parse_env_or("SIM_ROUNDS", 1)),
            games: overrides.games.unwrap_or_else(|| parse_env_or("SIM_GAMES", 1)),
            seed,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.game.size;
        if size == 0 || size % 2 != 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_BOARD_SIZE".to_string(),
                reason: "Must be a positive even number".to_string(),
            });
        }

        if let Some(pool) = self.game.theme.pool_size()
            && !self.game.theme.fits(size)
        {
            return Err(ConfigError::Invalid {
                var: "SIM_BOARD_SIZE".to_string(),
                reason: format!(
                    "{size}x{size} needs {} symbols, the {} theme has {pool}",
                    size * size / 2,
                    self.game.theme
                ),
            });
        }

        if !(constants::MIN_PLAYERS..=constants::MAX_PLAYERS).contains(&self.game.player_count) {
            return Err(ConfigError::Invalid {
                var: "SIM_PLAYERS".to_string(),
                reason: format!(
                    "Must be between {} and {}",
                    constants::MIN_PLAYERS,
                    constants::MAX_PLAYERS
                ),
            });
        }

        if self.rounds == 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_ROUNDS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.games == 0 {
            return Err(ConfigError::Invalid {
                var: "SIM_GAMES".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like `parse_env_or`, but a present and unparsable value is an error
fn parse_env_with<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = String>,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
            var: key.to_string(),
            reason,
        }),
        Err(_) => Ok(default),
    }
}
