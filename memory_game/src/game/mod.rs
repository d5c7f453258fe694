//! Memory game engine - core FSM and game entities.
//!
//! This module provides:
//! - The pure per-game state machine with its closed set of phases
//! - Player and game identities
//! - The masked view handed to subscribers

pub mod constants;
pub mod entities;
pub mod state_machine;

pub use entities::{GameId, GameView, Player, PlayerId, PlayerScore};
pub use state_machine::{
    Cause, GameContext, GameError, GameMachine, GameUpdate, MachineEvent, Phase,
};
