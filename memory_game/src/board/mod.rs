//! Game boards: the immutable grid of paired symbols a game is played on.
//!
//! A [`Board`] is validated on construction so that every symbol occurs
//! exactly twice. Boards are produced by a [`BoardFactory`], normally the
//! [`ShuffledBoardFactory`].

pub mod factory;

pub use factory::{BoardFactory, ShuffledBoardFactory, Theme};

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use thiserror::Error;

/// Errors that can occur while building a board
#[derive(Debug, Clone, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum BoardError {
    #[error("board size must be a positive even number, got {0}")]
    InvalidSize(usize),
    #[error("{theme} theme has {available} symbols, board of size {size} needs {required}")]
    NotEnoughSymbols {
        theme: Theme,
        size: usize,
        required: usize,
        available: usize,
    },
    #[error("board has no cells")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("symbol {symbol} occurs {count} times, expected exactly 2")]
    UnpairedSymbol { symbol: Symbol, count: usize },
}

/// A cell position on the board.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(usize, usize)> for Coord {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// Content of a single cell. Two cells match when their symbols are equal.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Immutable rectangular grid of symbols where every symbol occurs exactly twice.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Board {
    cells: Vec<Vec<Symbol>>,
}

impl Board {
    /// Build a board from its rows, checking shape and pairing.
    pub fn new(cells: Vec<Vec<Symbol>>) -> Result<Self, BoardError> {
        let expected = cells.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(BoardError::Empty);
        }

        let mut counts: HashMap<&Symbol, usize> = HashMap::new();
        for (row, cols) in cells.iter().enumerate() {
            if cols.len() != expected {
                return Err(BoardError::RaggedRow {
                    row,
                    len: cols.len(),
                    expected,
                });
            }
            for symbol in cols {
                *counts.entry(symbol).or_default() += 1;
            }
        }

        if let Some((symbol, count)) = counts.into_iter().find(|(_, count)| *count != 2) {
            return Err(BoardError::UnpairedSymbol {
                symbol: symbol.clone(),
                count,
            });
        }

        Ok(Self { cells })
    }

    /// Convenience constructor from string slices.
    ///
    /// ```
    /// use memory_game::board::{Board, Coord};
    ///
    /// let board = Board::from_strs(&[&["1", "2"], &["2", "1"]]).unwrap();
    /// assert_eq!(board.cell_count(), 4);
    /// assert_eq!(board.get(Coord::new(1, 0)).unwrap().as_str(), "2");
    /// ```
    pub fn from_strs(rows: &[&[&str]]) -> Result<Self, BoardError> {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|s| Symbol::from(*s)).collect())
                .collect(),
        )
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.rows() * self.cols()
    }

    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows() && coord.col < self.cols()
    }

    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<&Symbol> {
        self.cells.get(coord.row)?.get(coord.col)
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        let cols = self.cols();
        (0..self.rows()).flat_map(move |row| (0..cols).map(move |col| Coord::new(row, col)))
    }

    /// Symbols row by row.
    #[must_use]
    pub fn cells(&self) -> &[Vec<Symbol>] {
        &self.cells
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            cells: Vec<Vec<Symbol>>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.cells).map_err(serde::de::Error::custom)
    }
}
