/// Shown in place of every cell that is neither revealed this turn nor captured.
pub const HIDDEN_SYMBOL: &str = "❓";

pub const MIN_PLAYERS: usize = 1;
pub const MAX_PLAYERS: usize = 4;

pub const DEFAULT_BOARD_SIZE: usize = 4;
pub const DEFAULT_PLAYERS: usize = 2;

/// Delay before a revealed pair is scored at normal speed.
pub const DEFAULT_NORMAL_SCORE_DELAY_MS: u64 = 1_500;
/// Delay before a revealed pair is scored at relaxing speed.
pub const DEFAULT_RELAXING_SCORE_DELAY_MS: u64 = 3_000;
/// "Thinking time" between a robot deciding on a cell and the reveal landing.
pub const DEFAULT_AGENT_ACTION_DELAY_MS: u64 = 750;

pub const MACHINE_INBOX_CAPACITY: usize = 100;
