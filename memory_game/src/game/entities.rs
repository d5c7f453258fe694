use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::{constants::HIDDEN_SYMBOL, state_machine::GameContext, state_machine::Phase};
use crate::board::Coord;

/// Identity of a participant, stable for the lifetime of its session.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Fresh random identity, used for robot seats.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identity of a game owned by the manager.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A participant as shown in the roster.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub short_label: String,
    pub is_agent: bool,
}

/// One entry of the score table, in turn order.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerScore {
    pub player: PlayerId,
    pub score: u32,
}

/// What a subscriber is allowed to see of a game.
///
/// Cells outside `revealed_this_turn` and the captured set are replaced by
/// [`HIDDEN_SYMBOL`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameView {
    pub phase: Phase,
    pub board: Vec<Vec<String>>,
    pub revealed_this_turn: Vec<Coord>,
    pub scores: Vec<PlayerScore>,
    pub current_player: PlayerId,
    pub players: Vec<PlayerId>,
    pub move_count: u32,
    pub round: u32,
}

impl From<&GameContext> for GameView {
    fn from(ctx: &GameContext) -> Self {
        let board = ctx
            .board
            .cells()
            .iter()
            .enumerate()
            .map(|(row, symbols)| {
                symbols
                    .iter()
                    .enumerate()
                    .map(|(col, symbol)| {
                        if ctx.is_face_up(Coord::new(row, col)) {
                            symbol.to_string()
                        } else {
                            HIDDEN_SYMBOL.to_string()
                        }
                    })
                    .collect()
            })
            .collect();

        let scores = ctx
            .players
            .iter()
            .map(|player| PlayerScore {
                player: player.clone(),
                score: ctx.score_of(player),
            })
            .collect();

        Self {
            phase: ctx.phase,
            board,
            revealed_this_turn: ctx.revealed_this_turn.clone(),
            scores,
            current_player: ctx.current_player().clone(),
            players: ctx.players.clone(),
            move_count: ctx.move_count,
            round: ctx.round,
        }
    }
}

impl GameView {
    /// Number of cells still face down.
    #[must_use]
    pub fn hidden_cells(&self) -> usize {
        self.board
            .iter()
            .flatten()
            .filter(|cell| cell.as_str() == HIDDEN_SYMBOL)
            .count()
    }
}
