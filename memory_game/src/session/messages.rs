//! Machine actor message types and subscription streams.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::board::{Board, Coord};
use crate::game::{GameId, GameUpdate, GameView, PlayerId};

/// Identifies one subscriber of a machine's update stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

/// Messages that can be sent to a `MachineActor`
#[derive(Debug)]
pub enum MachineMessage {
    /// Reveal intent. `round` tags intents that were computed for a specific
    /// round; those arriving after a restart are dropped.
    Reveal {
        player: PlayerId,
        coord: Coord,
        round: Option<u32>,
    },

    /// Start a new round with a fresh board (only accepted when finished)
    Restart {
        board: Board,
        response: oneshot::Sender<bool>,
    },

    /// Get the current state
    GetCurrent {
        response: oneshot::Sender<GameUpdate>,
    },

    /// Register an update listener. The reply carries the state at the
    /// moment of registration; every later transition goes to `sender`.
    Subscribe {
        sender: mpsc::UnboundedSender<GameUpdate>,
        response: oneshot::Sender<(SubscriberId, GameUpdate)>,
    },

    /// Remove an update listener (no-op when unknown)
    Unsubscribe { subscriber: SubscriberId },

    /// Stop the actor. Pending score checks are cancelled.
    Close { response: oneshot::Sender<()> },
}

/// Live feed of machine transitions
#[derive(Debug)]
pub struct MachineSubscription {
    pub id: SubscriberId,

    /// State at subscription time
    pub current: GameUpdate,

    /// Every accepted transition after `current`, in order
    pub updates: mpsc::UnboundedReceiver<GameUpdate>,
}

/// Identifies a roster or game state subscription at the manager level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Event delivered on a game state subscription
#[derive(Debug, Clone, PartialEq)]
pub enum GameStateEvent {
    /// The game has not been started yet
    NotStarted,

    /// Masked state after a transition
    Changed(Arc<GameView>),
}

/// Receiving half of a manager-level subscription.
///
/// The stream ends (`recv` returns `None`) once the game is closed.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriptionId,
    game_id: GameId,
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        game_id: GameId,
        receiver: mpsc::UnboundedReceiver<T>,
    ) -> Self {
        Self {
            id,
            game_id,
            receiver,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}
