//! Session error types.

use std::fmt;
use thiserror::Error;

use super::config::ConfigError;
use crate::board::BoardError;
use crate::game::{GameError, GameId, PlayerId};

/// A machine handle was used after its actor stopped
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("game machine is no longer running")]
pub struct MachineClosed;

/// Lifecycle rule an operation violated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    AlreadyStarted,
    NotStarted,
    NotFinished,
    NoPlayers,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::AlreadyStarted => "game already started",
            Self::NotStarted => "game not started",
            Self::NotFinished => "game not finished",
            Self::NoPlayers => "no players to start with",
        };
        write!(f, "{repr}")
    }
}

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Unknown game id
    #[error("Game {0} not found")]
    GameNotFound(GameId),

    /// Identity is not part of the game
    #[error("Player {player} is not part of game {game}")]
    PlayerNotFound { game: GameId, player: PlayerId },

    /// Operation not allowed in the game's current lifecycle state
    #[error("Invalid lifecycle state: {0}")]
    InvalidLifecycleState(Lifecycle),

    #[error("Invalid game configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Board could not be generated (e.g. size too large for theme)
    #[error("Board generation failed: {0}")]
    Board(#[from] BoardError),

    #[error("Seating failed: {0}")]
    Seating(#[from] GameError),

    #[error(transparent)]
    MachineClosed(#[from] MachineClosed),
}

impl ManagerError {
    /// Whether the error refers to an unknown game or player
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ManagerError::GameNotFound(_) | ManagerError::PlayerNotFound { .. }
        )
    }

    /// Get a client-safe error message that doesn't leak identifiers
    pub fn client_message(&self) -> String {
        match self {
            ManagerError::GameNotFound(_) => "Game not found".to_string(),
            ManagerError::PlayerNotFound { .. } => "Not part of this game".to_string(),
            ManagerError::MachineClosed(_) => "Game is closed".to_string(),
            _ => self.to_string(),
        }
    }
}
