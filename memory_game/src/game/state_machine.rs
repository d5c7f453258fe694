//! Memory game state machine.
//!
//! The machine is pure: it owns a [`GameContext`] and turns [`MachineEvent`]s
//! into [`GameUpdate`]s. Timing (the delayed score check) is the job of the
//! actor that drives it, see [`crate::session::actor`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt,
    sync::Arc,
};
use thiserror::Error;

use super::entities::PlayerId;
use crate::board::{Board, Coord};

/// Errors that can occur while building a machine
#[derive(Debug, Clone, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("need at least one player")]
    NoPlayers,
    #[error("player {0} is seated twice")]
    DuplicatePlayer(PlayerId),
}

/// Discrete states of a game.
///
/// `LookingForWinner` is transient: the machine passes through it while
/// resolving a score check and never rests in it.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Phase {
    NoCellsRevealed,
    FirstCellRevealed,
    SecondCellRevealed,
    LookingForWinner,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::NoCellsRevealed => "no cells revealed",
            Self::FirstCellRevealed => "first cell revealed",
            Self::SecondCellRevealed => "second cell revealed",
            Self::LookingForWinner => "looking for winner",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

impl Phase {
    /// Whether a reveal can be accepted in this phase.
    #[must_use]
    pub const fn accepts_reveals(self) -> bool {
        matches!(self, Self::NoCellsRevealed | Self::FirstCellRevealed)
    }
}

/// Inputs to the machine.
#[derive(Clone, Debug, PartialEq)]
pub enum MachineEvent {
    RevealCell { player: PlayerId, coord: Coord },
    CheckScore,
    Restart(Board),
}

/// Why an update was emitted.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Cause {
    /// Synthetic update carrying the current state to a new subscriber.
    Current,
    CellRevealed(Coord),
    ScoreChecked {
        cells: [Coord; 2],
        matched: bool,
        player: PlayerId,
    },
    Restarted,
}

/// Mutable game data, owned by exactly one machine.
#[derive(Clone, Debug, Serialize)]
pub struct GameContext {
    pub board: Board,
    /// Turn order. Fixed for the lifetime of the machine.
    pub players: Vec<PlayerId>,
    pub current_player_index: usize,
    /// At most two cells, cleared every turn.
    pub revealed_this_turn: Vec<Coord>,
    /// Cells of matched pairs. Only ever grows within a round.
    pub captured_cells: BTreeSet<Coord>,
    pub scores: BTreeMap<PlayerId, u32>,
    /// Accepted reveals this round.
    pub move_count: u32,
    pub phase: Phase,
    /// Number of restarts applied.
    pub round: u32,
}

impl GameContext {
    #[must_use]
    pub fn current_player(&self) -> &PlayerId {
        &self.players[self.current_player_index]
    }

    #[must_use]
    pub fn is_captured(&self, coord: Coord) -> bool {
        self.captured_cells.contains(&coord)
    }

    #[must_use]
    pub fn is_face_up(&self, coord: Coord) -> bool {
        self.revealed_this_turn.contains(&coord) || self.is_captured(coord)
    }

    #[must_use]
    pub fn score_of(&self, player: &PlayerId) -> u32 {
        self.scores.get(player).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_won(&self) -> bool {
        self.captured_cells.len() == self.board.cell_count()
    }

    fn zeroed_scores(players: &[PlayerId]) -> BTreeMap<PlayerId, u32> {
        players.iter().map(|player| (player.clone(), 0)).collect()
    }
}

/// One accepted transition: the cause plus the complete resulting context.
#[derive(Clone, Debug)]
pub struct GameUpdate {
    pub cause: Cause,
    pub context: Arc<GameContext>,
}

impl GameUpdate {
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.context.phase
    }
}

/// Pure transition logic for one game.
#[derive(Debug)]
pub struct GameMachine {
    ctx: GameContext,
}

impl GameMachine {
    pub fn new(board: Board, players: Vec<PlayerId>) -> Result<Self, GameError> {
        if players.is_empty() {
            return Err(GameError::NoPlayers);
        }
        let mut seen = HashSet::with_capacity(players.len());
        if let Some(dup) = players.iter().find(|player| !seen.insert(*player)) {
            return Err(GameError::DuplicatePlayer(dup.clone()));
        }

        Ok(Self {
            ctx: GameContext {
                board,
                scores: GameContext::zeroed_scores(&players),
                players,
                current_player_index: 0,
                revealed_this_turn: Vec::with_capacity(2),
                captured_cells: BTreeSet::new(),
                move_count: 0,
                phase: Phase::NoCellsRevealed,
                round: 0,
            },
        })
    }

    #[must_use]
    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.ctx.phase
    }

    /// Current state wrapped as an update, for new subscribers.
    #[must_use]
    pub fn current(&self) -> GameUpdate {
        self.update(Cause::Current)
    }

    /// Apply an event. Returns `None` when the event is not valid in the
    /// current state; the context is then left untouched.
    pub fn handle(&mut self, event: MachineEvent) -> Option<GameUpdate> {
        let phase = self.ctx.phase;
        let cause = match phase {
            Phase::NoCellsRevealed | Phase::FirstCellRevealed => match event {
                MachineEvent::RevealCell { player, coord } => self.reveal(&player, coord),
                MachineEvent::CheckScore | MachineEvent::Restart(_) => None,
            },
            Phase::SecondCellRevealed => match event {
                MachineEvent::CheckScore => self.check_score(),
                MachineEvent::RevealCell { .. } | MachineEvent::Restart(_) => None,
            },
            Phase::LookingForWinner => None,
            Phase::Finished => match event {
                MachineEvent::Restart(board) => Some(self.restart(board)),
                MachineEvent::RevealCell { .. } | MachineEvent::CheckScore => None,
            },
        };

        match cause {
            Some(cause) => Some(self.update(cause)),
            None => {
                debug!("Ignored event in phase '{phase}'");
                None
            }
        }
    }

    fn update(&self, cause: Cause) -> GameUpdate {
        GameUpdate {
            cause,
            context: Arc::new(self.ctx.clone()),
        }
    }

    fn reveal(&mut self, player: &PlayerId, coord: Coord) -> Option<Cause> {
        let ctx = &mut self.ctx;
        if ctx.current_player() != player
            || ctx.revealed_this_turn.len() >= 2
            || !ctx.board.contains(coord)
            || ctx.is_face_up(coord)
        {
            return None;
        }

        ctx.revealed_this_turn.push(coord);
        ctx.move_count += 1;
        ctx.phase = if ctx.revealed_this_turn.len() == 1 {
            Phase::FirstCellRevealed
        } else {
            Phase::SecondCellRevealed
        };

        Some(Cause::CellRevealed(coord))
    }

    fn check_score(&mut self) -> Option<Cause> {
        let ctx = &mut self.ctx;
        let cells: [Coord; 2] = ctx.revealed_this_turn.as_slice().try_into().ok()?;
        let player = ctx.current_player().clone();
        let matched = ctx.board.get(cells[0]) == ctx.board.get(cells[1]);

        if matched {
            ctx.captured_cells.extend(cells);
            *ctx.scores.entry(player.clone()).or_default() += 1;
        }
        ctx.revealed_this_turn.clear();
        ctx.current_player_index = (ctx.current_player_index + 1) % ctx.players.len();
        ctx.phase = Phase::LookingForWinner;

        self.look_for_winner();

        Some(Cause::ScoreChecked {
            cells,
            matched,
            player,
        })
    }

    fn look_for_winner(&mut self) {
        self.ctx.phase = if self.ctx.is_won() {
            Phase::Finished
        } else {
            Phase::NoCellsRevealed
        };
    }

    fn restart(&mut self, board: Board) -> Cause {
        let ctx = &mut self.ctx;
        ctx.board = board;
        ctx.revealed_this_turn.clear();
        ctx.captured_cells.clear();
        ctx.scores = GameContext::zeroed_scores(&ctx.players);
        ctx.move_count = 0;
        ctx.current_player_index = 0;
        ctx.round += 1;
        ctx.phase = Phase::NoCellsRevealed;

        Cause::Restarted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Vec<PlayerId> {
        vec![PlayerId::new("A"), PlayerId::new("B")]
    }

    fn machine(rows: &[&[&str]]) -> GameMachine {
        GameMachine::new(Board::from_strs(rows).unwrap(), players()).unwrap()
    }

    fn reveal(machine: &mut GameMachine, player: &str, row: usize, col: usize) -> bool {
        machine
            .handle(MachineEvent::RevealCell {
                player: PlayerId::new(player),
                coord: Coord::new(row, col),
            })
            .is_some()
    }

    #[test]
    fn test_new_machine_initial_state() {
        let machine = machine(&[&["1", "2"], &["2", "1"]]);
        let ctx = machine.context();
        assert_eq!(ctx.phase, Phase::NoCellsRevealed);
        assert_eq!(ctx.current_player(), &PlayerId::new("A"));
        assert_eq!(ctx.score_of(&PlayerId::new("B")), 0);
        assert_eq!(ctx.scores.len(), 2);
        assert_eq!(ctx.move_count, 0);
    }

    #[test]
    fn test_new_machine_rejects_bad_rosters() {
        let board = Board::from_strs(&[&["1", "1"]]).unwrap();
        assert_eq!(
            GameMachine::new(board.clone(), vec![]).unwrap_err(),
            GameError::NoPlayers
        );
        assert_eq!(
            GameMachine::new(board, vec!["A".into(), "A".into()]).unwrap_err(),
            GameError::DuplicatePlayer("A".into())
        );
    }

    #[test]
    fn test_two_by_two_scenario() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);

        assert!(reveal(&mut m, "A", 0, 0));
        assert_eq!(m.phase(), Phase::FirstCellRevealed);
        assert!(reveal(&mut m, "A", 0, 1));
        assert_eq!(m.phase(), Phase::SecondCellRevealed);

        let update = m.handle(MachineEvent::CheckScore).unwrap();
        assert_eq!(
            update.cause,
            Cause::ScoreChecked {
                cells: [Coord::new(0, 0), Coord::new(0, 1)],
                matched: false,
                player: "A".into(),
            }
        );
        assert_eq!(m.phase(), Phase::NoCellsRevealed);
        assert_eq!(m.context().current_player(), &PlayerId::new("B"));
        assert_eq!(m.context().score_of(&"A".into()), 0);

        assert!(reveal(&mut m, "B", 1, 0));
        assert!(reveal(&mut m, "B", 1, 1));
        m.handle(MachineEvent::CheckScore).unwrap();
        assert_eq!(m.context().current_player(), &PlayerId::new("A"));
        assert_eq!(m.context().move_count, 4);
        assert!(m.context().captured_cells.is_empty());

        // A finds the pair of 1s
        assert!(reveal(&mut m, "A", 0, 0));
        assert!(reveal(&mut m, "A", 1, 1));
        let update = m.handle(MachineEvent::CheckScore).unwrap();
        assert!(matches!(update.cause, Cause::ScoreChecked { matched: true, .. }));
        assert_eq!(m.context().score_of(&"A".into()), 1);
        assert_eq!(m.context().captured_cells.len(), 2);
        assert_eq!(m.phase(), Phase::NoCellsRevealed);
        // turn passes even after a match
        assert_eq!(m.context().current_player(), &PlayerId::new("B"));

        assert!(reveal(&mut m, "B", 0, 1));
        assert!(reveal(&mut m, "B", 1, 0));
        m.handle(MachineEvent::CheckScore).unwrap();
        assert_eq!(m.phase(), Phase::Finished);
        assert_eq!(m.context().score_of(&"B".into()), 1);
        assert_eq!(m.context().captured_cells.len(), 4);
        assert_eq!(m.context().move_count, 8);
    }

    #[test]
    fn test_reveal_rejected_for_wrong_player() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);
        assert!(!reveal(&mut m, "B", 0, 0));
        assert_eq!(m.phase(), Phase::NoCellsRevealed);
        assert!(m.context().revealed_this_turn.is_empty());
        assert_eq!(m.context().move_count, 0);
    }

    #[test]
    fn test_reveal_rejected_for_unknown_player() {
        let mut m = machine(&[&["1", "1"]]);
        assert!(!reveal(&mut m, "Z", 0, 0));
    }

    #[test]
    fn test_same_cell_twice_rejected() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);
        assert!(reveal(&mut m, "A", 0, 0));
        assert!(!reveal(&mut m, "A", 0, 0));
        assert_eq!(m.context().revealed_this_turn, vec![Coord::new(0, 0)]);
        assert_eq!(m.phase(), Phase::FirstCellRevealed);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);
        assert!(!reveal(&mut m, "A", 2, 0));
        assert!(!reveal(&mut m, "A", 0, 5));
    }

    #[test]
    fn test_third_reveal_rejected_while_pair_face_up() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);
        assert!(reveal(&mut m, "A", 0, 0));
        assert!(reveal(&mut m, "A", 0, 1));
        assert!(!reveal(&mut m, "A", 1, 0));
        assert_eq!(m.context().revealed_this_turn.len(), 2);
    }

    #[test]
    fn test_captured_cell_rejected() {
        let mut m = machine(&[&["1", "1"], &["2", "2"]]);
        assert!(reveal(&mut m, "A", 0, 0));
        assert!(reveal(&mut m, "A", 0, 1));
        m.handle(MachineEvent::CheckScore).unwrap();

        let before = m.context().clone();
        assert!(!reveal(&mut m, "B", 0, 0));
        assert_eq!(m.context().revealed_this_turn, before.revealed_this_turn);
        assert_eq!(m.context().move_count, before.move_count);
    }

    #[test]
    fn test_check_score_only_with_two_revealed() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);
        assert!(m.handle(MachineEvent::CheckScore).is_none());
        assert!(reveal(&mut m, "A", 0, 0));
        assert!(m.handle(MachineEvent::CheckScore).is_none());
        assert_eq!(m.phase(), Phase::FirstCellRevealed);
    }

    #[test]
    fn test_restart_only_from_finished() {
        let mut m = machine(&[&["1", "1"]]);
        let board = Board::from_strs(&[&["7", "7"]]).unwrap();
        assert!(m.handle(MachineEvent::Restart(board.clone())).is_none());
        assert_eq!(m.context().round, 0);

        assert!(reveal(&mut m, "A", 0, 0));
        assert!(reveal(&mut m, "A", 0, 1));
        m.handle(MachineEvent::CheckScore).unwrap();
        assert_eq!(m.phase(), Phase::Finished);
        assert!(!reveal(&mut m, "B", 0, 0));

        let update = m.handle(MachineEvent::Restart(board.clone())).unwrap();
        assert_eq!(update.cause, Cause::Restarted);
        let ctx = m.context();
        assert_eq!(ctx.phase, Phase::NoCellsRevealed);
        assert_eq!(ctx.board, board);
        assert!(ctx.captured_cells.is_empty());
        assert!(ctx.revealed_this_turn.is_empty());
        assert_eq!(ctx.move_count, 0);
        assert_eq!(ctx.current_player(), &PlayerId::new("A"));
        assert!(ctx.scores.values().all(|score| *score == 0));
        assert_eq!(ctx.round, 1);
    }

    #[test]
    fn test_single_player_keeps_turn() {
        let board = Board::from_strs(&[&["1", "2"], &["2", "1"]]).unwrap();
        let mut m = GameMachine::new(board, vec!["solo".into()]).unwrap();
        assert!(reveal(&mut m, "solo", 0, 0));
        assert!(reveal(&mut m, "solo", 0, 1));
        m.handle(MachineEvent::CheckScore).unwrap();
        assert_eq!(m.context().current_player(), &PlayerId::new("solo"));
        assert_eq!(m.context().move_count, 2);
    }

    #[test]
    fn test_updates_carry_full_context() {
        let mut m = machine(&[&["1", "2"], &["2", "1"]]);
        let update = m
            .handle(MachineEvent::RevealCell {
                player: "A".into(),
                coord: Coord::new(1, 1),
            })
            .unwrap();
        assert_eq!(update.cause, Cause::CellRevealed(Coord::new(1, 1)));
        assert_eq!(update.phase(), Phase::FirstCellRevealed);
        assert_eq!(update.context.revealed_this_turn, vec![Coord::new(1, 1)]);
        assert_eq!(m.current().cause, Cause::Current);
    }
}
