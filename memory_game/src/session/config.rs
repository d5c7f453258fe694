//! Game configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::board::Theme;
use crate::game::constants::{
    DEFAULT_AGENT_ACTION_DELAY_MS, DEFAULT_BOARD_SIZE, DEFAULT_NORMAL_SCORE_DELAY_MS,
    DEFAULT_PLAYERS, DEFAULT_RELAXING_SCORE_DELAY_MS, MAX_PLAYERS, MIN_PLAYERS,
};

/// Game speed variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSpeed {
    Normal,
    Relaxing,
}

impl std::fmt::Display for GameSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameSpeed::Normal => write!(f, "normal"),
            GameSpeed::Relaxing => write!(f, "relaxing"),
        }
    }
}

impl std::str::FromStr for GameSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(GameSpeed::Normal),
            "relaxing" => Ok(GameSpeed::Relaxing),
            other => Err(format!("unknown speed '{other}'")),
        }
    }
}

/// Engine-wide delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How long a revealed pair stays face up at normal speed
    pub normal_score_delay: Duration,

    /// How long a revealed pair stays face up at relaxing speed
    pub relaxing_score_delay: Duration,

    /// Pause between a robot choosing a cell and the reveal reaching the game
    pub agent_action_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            normal_score_delay: Duration::from_millis(DEFAULT_NORMAL_SCORE_DELAY_MS),
            relaxing_score_delay: Duration::from_millis(DEFAULT_RELAXING_SCORE_DELAY_MS),
            agent_action_delay: Duration::from_millis(DEFAULT_AGENT_ACTION_DELAY_MS),
        }
    }
}

impl Timings {
    /// No delays at all. Useful for simulations.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            normal_score_delay: Duration::ZERO,
            relaxing_score_delay: Duration::ZERO,
            agent_action_delay: Duration::ZERO,
        }
    }

    /// Get score check delay based on game speed
    #[must_use]
    pub fn score_check_delay(&self, speed: GameSpeed) -> Duration {
        match speed {
            GameSpeed::Normal => self.normal_score_delay,
            GameSpeed::Relaxing => self.relaxing_score_delay,
        }
    }
}

/// Invalid game configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board size must be a positive even number, got {0}")]
    InvalidSize(usize),

    #[error("player count must be between {MIN_PLAYERS} and {MAX_PLAYERS}, got {0}")]
    InvalidPlayerCount(usize),
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Board side length (even)
    pub size: usize,

    /// Symbol set
    pub theme: Theme,

    /// Number of seats in the turn order
    pub player_count: usize,

    /// Score check pacing
    pub speed: GameSpeed,

    /// Whether seats without a human are filled with robots on start
    pub with_agents: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_BOARD_SIZE,
            theme: Theme::Numeric,
            player_count: DEFAULT_PLAYERS,
            speed: GameSpeed::Normal,
            with_agents: true,
        }
    }
}

impl GameConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 || self.size % 2 != 0 {
            return Err(ConfigError::InvalidSize(self.size));
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.player_count) {
            return Err(ConfigError::InvalidPlayerCount(self.player_count));
        }

        Ok(())
    }
}
