//! Robot player models.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::board::Coord;
use crate::game::PlayerId;

/// A cell a robot wants to reveal.
///
/// Tagged with the round it was computed for so that intents still in
/// flight when the game restarts can be recognized as stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealIntent {
    /// Robot identity
    pub player: PlayerId,

    /// Target cell
    pub coord: Coord,

    /// Round the decision was made in
    pub round: u32,
}

/// Receives every intent a robot emits
pub type ActionListener = mpsc::UnboundedSender<RevealIntent>;
