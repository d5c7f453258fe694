//! # Memory Game
//!
//! A pair-matching memory game engine with robot players.
//!
//! Each game runs as its own actor around a pure finite state machine. The
//! machine moves through five phases:
//!
//! - **NoCellsRevealed**: waiting for the current player's first card
//! - **FirstCellRevealed**: waiting for the second card
//! - **SecondCellRevealed**: both cards face up until the score check fires
//! - **LookingForWinner**: transient, resolves to the next turn or the end
//! - **Finished**: every pair captured, waiting for a restart
//!
//! ## Core Modules
//!
//! - [`board`]: Boards, coordinates and the shuffled board factory
//! - [`game`]: Game state machine and entities
//! - [`bot`]: Robot decision policy and per-game robot management
//! - [`session`]: Machine actors, subscriptions and the game manager
//!
//! ## Example
//!
//! ```
//! use memory_game::{Board, GameMachine, Phase};
//!
//! let board = Board::from_strs(&[&["1", "2"], &["2", "1"]]).unwrap();
//! let machine = GameMachine::new(board, vec!["alice".into()]).unwrap();
//! assert_eq!(machine.phase(), Phase::NoCellsRevealed);
//! ```

/// Boards and board generation.
pub mod board;
pub use board::{Board, BoardError, BoardFactory, Coord, ShuffledBoardFactory, Symbol, Theme};

/// Robot players.
pub mod bot;

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    Cause, GameContext, GameError, GameId, GameMachine, GameUpdate, GameView, MachineEvent,
    Phase, Player, PlayerId, PlayerScore, constants,
};

/// Running games and the manager that owns them.
pub mod session;
pub use session::{
    GameConfig, GameManager, GameSpeed, GameStateEvent, ManagerError, Subscription, Timings,
};
