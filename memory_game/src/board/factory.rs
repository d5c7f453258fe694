//! Field generator filling a square board with shuffled symbol pairs.

use super::{Board, BoardError, Coord, Symbol};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Symbols available to the symbolic theme.
pub const EMOJIS: [&str; 24] = [
    "❤️", "😊", "✨", "🔥", "😂", "👍", "✅", "✔️", "😭", "🥰", "😍", "🥺", "🤍", "👀", "🎉", "🥲",
    "😉", "👉", "⭐", "❤️‍🔥", "🤔", "🤩", "🤣", "🤗",
];

/// Symbol set a board is filled with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Numeric,
    Symbolic,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Numeric => write!(f, "numeric"),
            Theme::Symbolic => write!(f, "symbolic"),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numeric" | "numbers" => Ok(Theme::Numeric),
            "symbolic" | "emojis" => Ok(Theme::Symbolic),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

impl Theme {
    /// Number of distinct symbols the theme can supply. Numbers never run
    /// out, so the numeric theme has no limit.
    #[must_use]
    pub const fn pool_size(self) -> Option<usize> {
        match self {
            Theme::Numeric => None,
            Theme::Symbolic => Some(EMOJIS.len()),
        }
    }

    /// Whether the theme can fill a `size x size` board
    #[must_use]
    pub const fn fits(self, size: usize) -> bool {
        match self.pool_size() {
            Some(pool) => size * size / 2 <= pool,
            None => true,
        }
    }

    /// First `count` symbols of the theme, or `None` if the pool is too small.
    fn symbols(self, count: usize) -> Option<Vec<Symbol>> {
        match self {
            Theme::Numeric => Some((1..=count).map(|n| Symbol::new(n.to_string())).collect()),
            Theme::Symbolic => EMOJIS
                .get(..count)
                .map(|pool| pool.iter().map(|s| Symbol::from(*s)).collect()),
        }
    }
}

/// Source of fresh boards for new and restarted games.
pub trait BoardFactory: Send + Sync {
    /// Generate a `size x size` board for `theme`.
    fn generate(&self, size: usize, theme: Theme) -> Result<Board, BoardError>;
}

/// Places each symbol pair on two random cells.
pub struct ShuffledBoardFactory {
    rng: Mutex<StdRng>,
}

impl Default for ShuffledBoardFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ShuffledBoardFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic factory for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl BoardFactory for ShuffledBoardFactory {
    fn generate(&self, size: usize, theme: Theme) -> Result<Board, BoardError> {
        if size == 0 || size % 2 != 0 {
            return Err(BoardError::InvalidSize(size));
        }

        let required = size * size / 2;
        let symbols = theme
            .symbols(required)
            .ok_or(BoardError::NotEnoughSymbols {
                theme,
                size,
                required,
                available: theme.pool_size().unwrap_or(required),
            })?;

        let mut positions: Vec<Coord> = (0..size)
            .flat_map(|row| (0..size).map(move |col| Coord::new(row, col)))
            .collect();
        {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            positions.shuffle(&mut *rng);
        }

        let mut cells = vec![vec![Symbol::new(""); size]; size];
        for (pair, symbol) in positions.chunks_exact(2).zip(symbols) {
            cells[pair[0].row][pair[0].col] = symbol.clone();
            cells[pair[1].row][pair[1].col] = symbol;
        }

        Board::new(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn symbol_counts(board: &Board) -> HashMap<Symbol, usize> {
        let mut counts = HashMap::new();
        for coord in board.coords() {
            *counts.entry(board.get(coord).unwrap().clone()).or_default() += 1;
        }
        counts
    }

    #[test]
    fn test_numeric_board_has_size_squared_cells() {
        let board = ShuffledBoardFactory::seeded(7)
            .generate(4, Theme::Numeric)
            .unwrap();
        assert_eq!(board.rows(), 4);
        assert_eq!(board.cols(), 4);

        let counts = symbol_counts(&board);
        assert_eq!(counts.len(), 8);
        for (symbol, count) in counts {
            assert_eq!(count, 2);
            assert!(symbol.as_str().parse::<usize>().is_ok());
        }
    }

    #[test]
    fn test_symbolic_board_uses_emojis() {
        let board = ShuffledBoardFactory::seeded(1)
            .generate(6, Theme::Symbolic)
            .unwrap();
        for coord in board.coords() {
            assert!(EMOJIS.contains(&board.get(coord).unwrap().as_str()));
        }
    }

    #[test]
    fn test_symbolic_pool_exhausted() {
        let err = ShuffledBoardFactory::new()
            .generate(8, Theme::Symbolic)
            .unwrap_err();
        assert_eq!(
            err,
            BoardError::NotEnoughSymbols {
                theme: Theme::Symbolic,
                size: 8,
                required: 32,
                available: 24,
            }
        );
    }

    #[test]
    fn test_numeric_theme_has_no_size_limit() {
        let board = ShuffledBoardFactory::seeded(1)
            .generate(12, Theme::Numeric)
            .unwrap();
        let counts = symbol_counts(&board);
        assert_eq!(counts.len(), 72);
        assert!(counts.contains_key(&Symbol::new("72")));
        assert!(counts.values().all(|count| *count == 2));

        assert!(Theme::Numeric.fits(20));
        assert!(Theme::Symbolic.fits(6));
        assert!(!Theme::Symbolic.fits(8));
    }

    #[test]
    fn test_odd_or_zero_size_rejected() {
        let factory = ShuffledBoardFactory::new();
        assert_eq!(
            factory.generate(3, Theme::Numeric).unwrap_err(),
            BoardError::InvalidSize(3)
        );
        assert_eq!(
            factory.generate(0, Theme::Numeric).unwrap_err(),
            BoardError::InvalidSize(0)
        );
    }

    #[test]
    fn test_seeded_factory_is_reproducible() {
        let a = ShuffledBoardFactory::seeded(42).generate(4, Theme::Numeric);
        let b = ShuffledBoardFactory::seeded(42).generate(4, Theme::Numeric);
        assert_eq!(a, b);
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!("numbers".parse::<Theme>(), Ok(Theme::Numeric));
        assert_eq!("Symbolic".parse::<Theme>(), Ok(Theme::Symbolic));
        assert!("cards".parse::<Theme>().is_err());
    }
}
