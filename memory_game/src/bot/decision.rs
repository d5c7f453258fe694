//! Robot decision-making: remember what has been seen, play known pairs,
//! otherwise explore.

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;

use super::models::RevealIntent;
use crate::board::{Board, Coord, Symbol};
use crate::game::{Cause, GameContext, GameUpdate, Phase, PlayerId};

/// Source of exploration choices.
pub trait IndexPicker {
    /// Pick an index in `0..len`. Never called with `len == 0`.
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform picks from a random number generator
#[derive(Debug, Clone)]
pub struct RandomPicker<R = StdRng> {
    rng: R,
}

impl RandomPicker<StdRng> {
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> IndexPicker for RandomPicker<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Always takes the first candidate. Makes robot play reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPicker;

impl IndexPicker for FirstPicker {
    fn pick(&mut self, _len: usize) -> usize {
        0
    }
}

/// Memory of one robot seat.
///
/// `known_locations` maps a symbol to the cells it has been seen at (never
/// more than two) and loses the symbol once its pair is captured.
/// `unseen_cells` holds cells the robot has never seen face up.
#[derive(Debug)]
pub struct MemoryAgent<P> {
    player: PlayerId,
    known_locations: BTreeMap<Symbol, Vec<Coord>>,
    unseen_cells: Vec<Coord>,
    picker: P,
}

impl<P: IndexPicker> MemoryAgent<P> {
    /// Create a robot with no knowledge of `board`
    pub fn new(player: PlayerId, board: &Board, picker: P) -> Self {
        Self {
            player,
            known_locations: BTreeMap::new(),
            unseen_cells: board.coords().collect(),
            picker,
        }
    }

    #[must_use]
    pub fn player(&self) -> &PlayerId {
        &self.player
    }

    #[must_use]
    pub fn known_locations(&self) -> &BTreeMap<Symbol, Vec<Coord>> {
        &self.known_locations
    }

    #[must_use]
    pub fn unseen_cells(&self) -> &[Coord] {
        &self.unseen_cells
    }

    /// Forget everything and start over on `board`
    pub fn reset(&mut self, board: &Board) {
        self.known_locations.clear();
        self.unseen_cells = board.coords().collect();
    }

    /// Learn from one update and decide whether to act.
    ///
    /// # Arguments
    ///
    /// * `update` - next transition of the game, in emission order
    ///
    /// # Returns
    ///
    /// * `Option<RevealIntent>` - a cell to reveal when it is this robot's
    ///   turn and a reveal is possible
    pub fn observe(&mut self, update: &GameUpdate) -> Option<RevealIntent> {
        let ctx = update.context.as_ref();
        match &update.cause {
            Cause::Current => self.sync(ctx),
            Cause::CellRevealed(coord) => self.memorize(&ctx.board, *coord),
            Cause::ScoreChecked {
                cells,
                matched: true,
                ..
            } => self.forget_pair(&ctx.board, cells),
            Cause::ScoreChecked { matched: false, .. } => {}
            Cause::Restarted => self.reset(&ctx.board),
        }

        match ctx.phase {
            Phase::NoCellsRevealed | Phase::FirstCellRevealed => self.decide(ctx),
            Phase::SecondCellRevealed | Phase::LookingForWinner | Phase::Finished => None,
        }
    }

    /// Catch up with a game joined mid-round
    fn sync(&mut self, ctx: &GameContext) {
        self.unseen_cells.retain(|coord| !ctx.is_captured(*coord));
        self.known_locations.retain(|_, cells| {
            cells.retain(|coord| !ctx.is_captured(*coord));
            !cells.is_empty()
        });
        for coord in &ctx.revealed_this_turn {
            self.memorize(&ctx.board, *coord);
        }
    }

    fn memorize(&mut self, board: &Board, coord: Coord) {
        if let Some(symbol) = board.get(coord) {
            let cells = self.known_locations.entry(symbol.clone()).or_default();
            if !cells.contains(&coord) {
                cells.push(coord);
            }
        }
        self.unseen_cells.retain(|unseen| *unseen != coord);
    }

    fn forget_pair(&mut self, board: &Board, cells: &[Coord; 2]) {
        if let Some(symbol) = board.get(cells[0]) {
            self.known_locations.remove(symbol);
        }
        self.unseen_cells.retain(|unseen| !cells.contains(unseen));
    }

    fn decide(&mut self, ctx: &GameContext) -> Option<RevealIntent> {
        if ctx.current_player() != &self.player {
            return None;
        }

        let coord = self.known_pair_cell(ctx).or_else(|| self.explore(ctx))?;
        Some(RevealIntent {
            player: self.player.clone(),
            coord,
            round: ctx.round,
        })
    }

    /// A face-down cell of a fully located pair, preferring the partner of
    /// the card already face up this turn.
    fn known_pair_cell(&self, ctx: &GameContext) -> Option<Coord> {
        let complete = |cells: &&Vec<Coord>| cells.len() == 2;
        let partner = ctx
            .revealed_this_turn
            .first()
            .and_then(|coord| ctx.board.get(*coord))
            .and_then(|symbol| self.known_locations.get(symbol))
            .filter(complete);

        partner
            .into_iter()
            .chain(self.known_locations.values().filter(complete))
            .flatten()
            .copied()
            .find(|coord| !ctx.is_face_up(*coord))
    }

    fn explore(&mut self, ctx: &GameContext) -> Option<Coord> {
        self.unseen_cells.retain(|coord| !ctx.is_face_up(*coord));
        if self.unseen_cells.is_empty() {
            return None;
        }
        let index = self.picker.pick(self.unseen_cells.len());
        let index = index.min(self.unseen_cells.len() - 1);
        Some(self.unseen_cells.remove(index))
    }
}
