//! Robot players.
//!
//! This module implements:
//! - `MemoryAgent`: remembers every revealed cell, plays a pair as soon as
//!   both halves are located and otherwise explores unseen cells
//! - `AgentManager`: runs the robots of one game and paces their reveals
//!
//! ## Example
//!
//! ```
//! use memory_game::board::{Board, Coord};
//! use memory_game::bot::{FirstPicker, MemoryAgent};
//! use memory_game::game::GameMachine;
//!
//! let board = Board::from_strs(&[&["x", "x"]]).unwrap();
//! let machine = GameMachine::new(board.clone(), vec!["robot".into()]).unwrap();
//! let mut agent = MemoryAgent::new("robot".into(), &board, FirstPicker);
//!
//! let intent = agent.observe(&machine.current()).unwrap();
//! assert_eq!(intent.coord, Coord::new(0, 0));
//! ```

pub mod decision;
pub mod manager;
pub mod models;

pub use decision::{FirstPicker, IndexPicker, MemoryAgent, RandomPicker};
pub use manager::AgentManager;
pub use models::{ActionListener, RevealIntent};
