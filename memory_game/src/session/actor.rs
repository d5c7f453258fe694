//! Machine actor: runs one game's state machine and its delayed score check.

use log::{debug, info, warn};
use std::{collections::HashMap, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    time::{Instant, sleep_until},
};

use super::{
    errors::MachineClosed,
    messages::{MachineMessage, MachineSubscription, SubscriberId},
};
use crate::board::{Board, Coord};
use crate::game::{
    GameId, GameMachine, GameUpdate, MachineEvent, Phase, PlayerId,
    constants::MACHINE_INBOX_CAPACITY,
};

/// Handle for sending messages to a machine actor
#[derive(Clone, Debug)]
pub struct MachineHandle {
    sender: mpsc::Sender<MachineMessage>,
    game_id: GameId,
}

impl MachineHandle {
    /// Create a new machine handle
    pub fn new(sender: mpsc::Sender<MachineMessage>, game_id: GameId) -> Self {
        Self { sender, game_id }
    }

    /// Get game ID
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Send a message to the machine
    pub async fn send(&self, message: MachineMessage) -> Result<(), MachineClosed> {
        self.sender.send(message).await.map_err(|_| MachineClosed)
    }

    /// Submit a reveal. Invalid reveals are silently dropped by the machine.
    pub async fn reveal(&self, player: PlayerId, coord: Coord) -> Result<(), MachineClosed> {
        self.send(MachineMessage::Reveal {
            player,
            coord,
            round: None,
        })
        .await
    }

    /// Submit a reveal that only applies while the game is in `round`.
    pub async fn reveal_in_round(
        &self,
        player: PlayerId,
        coord: Coord,
        round: u32,
    ) -> Result<(), MachineClosed> {
        self.send(MachineMessage::Reveal {
            player,
            coord,
            round: Some(round),
        })
        .await
    }

    /// Ask for a new round. Returns `false` if the game was not finished.
    pub async fn restart(&self, board: Board) -> Result<bool, MachineClosed> {
        let (response, rx) = oneshot::channel();
        self.send(MachineMessage::Restart { board, response })
            .await?;
        rx.await.map_err(|_| MachineClosed)
    }

    /// Current state of the machine
    pub async fn current(&self) -> Result<GameUpdate, MachineClosed> {
        let (response, rx) = oneshot::channel();
        self.send(MachineMessage::GetCurrent { response }).await?;
        rx.await.map_err(|_| MachineClosed)
    }

    /// Subscribe to transitions.
    ///
    /// # Returns
    ///
    /// * `MachineSubscription` - the state at registration plus a receiver
    ///   for every later transition, with nothing lost in between
    pub async fn subscribe(&self) -> Result<MachineSubscription, MachineClosed> {
        let (sender, updates) = mpsc::unbounded_channel();
        let (response, rx) = oneshot::channel();
        self.send(MachineMessage::Subscribe { sender, response })
            .await?;
        let (id, current) = rx.await.map_err(|_| MachineClosed)?;
        Ok(MachineSubscription {
            id,
            current,
            updates,
        })
    }

    /// Unsubscribe a listener. Unknown ids and closed machines are ignored.
    pub async fn unsubscribe(&self, subscriber: SubscriberId) {
        if self
            .send(MachineMessage::Unsubscribe { subscriber })
            .await
            .is_err()
        {
            debug!("Game {}: unsubscribe after close", self.game_id);
        }
    }

    /// Stop the machine and wait for it to acknowledge
    pub async fn close(&self) -> Result<(), MachineClosed> {
        let (response, rx) = oneshot::channel();
        self.send(MachineMessage::Close { response }).await?;
        rx.await.map_err(|_| MachineClosed)
    }
}

/// Actor owning a single game's machine
pub struct MachineActor {
    game_id: GameId,

    machine: GameMachine,

    /// Message inbox
    inbox: mpsc::Receiver<MachineMessage>,

    /// Update listeners
    subscribers: HashMap<SubscriberId, mpsc::UnboundedSender<GameUpdate>>,

    next_subscriber: u64,

    /// How long a revealed pair stays face up
    score_delay: Duration,

    /// Armed on entering `SecondCellRevealed`
    score_check_at: Option<Instant>,

    is_closed: bool,
}

impl MachineActor {
    /// Create a new machine actor
    ///
    /// # Arguments
    ///
    /// * `game_id` - Game ID
    /// * `machine` - Machine in its initial state
    /// * `score_delay` - Delay between the second reveal and the score check
    ///
    /// # Returns
    ///
    /// * `(MachineActor, MachineHandle)` - Actor and handle for sending messages
    pub fn new(game_id: GameId, machine: GameMachine, score_delay: Duration) -> (Self, MachineHandle) {
        let (sender, inbox) = mpsc::channel(MACHINE_INBOX_CAPACITY);

        let actor = Self {
            game_id,
            machine,
            inbox,
            subscribers: HashMap::new(),
            next_subscriber: 0,
            score_delay,
            score_check_at: None,
            is_closed: false,
        };

        (actor, MachineHandle::new(sender, game_id))
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        info!(
            "Game {} machine starting with {} players",
            self.game_id,
            self.machine.context().players.len()
        );

        loop {
            let deadline = self.score_check_at;
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => {
                        self.handle_message(message);
                        if self.is_closed {
                            break;
                        }
                    }
                    None => break,
                },

                () = wait_for(deadline), if deadline.is_some() => {
                    self.score_check_at = None;
                    self.apply(MachineEvent::CheckScore);
                }
            }
        }

        self.subscribers.clear();
        info!("Game {} machine stopped", self.game_id);
    }

    fn handle_message(&mut self, message: MachineMessage) {
        match message {
            MachineMessage::Reveal {
                player,
                coord,
                round,
            } => {
                let current_round = self.machine.context().round;
                if let Some(round) = round
                    && round != current_round
                {
                    debug!(
                        "Game {}: dropped reveal from {player} for round {round} (now {current_round})",
                        self.game_id
                    );
                    return;
                }
                self.apply(MachineEvent::RevealCell { player, coord });
            }

            MachineMessage::Restart { board, response } => {
                self.score_check_at = None;
                let restarted = self.apply(MachineEvent::Restart(board));
                let _ = response.send(restarted);
            }

            MachineMessage::GetCurrent { response } => {
                let _ = response.send(self.machine.current());
            }

            MachineMessage::Subscribe { sender, response } => {
                let id = SubscriberId(self.next_subscriber);
                self.next_subscriber += 1;
                if response.send((id, self.machine.current())).is_ok() {
                    self.subscribers.insert(id, sender);
                    debug!("Game {}: subscriber {} registered", self.game_id, id.0);
                }
            }

            MachineMessage::Unsubscribe { subscriber } => {
                if self.subscribers.remove(&subscriber).is_some() {
                    debug!("Game {}: subscriber {} removed", self.game_id, subscriber.0);
                }
            }

            MachineMessage::Close { response } => {
                self.score_check_at = None;
                self.is_closed = true;
                let _ = response.send(());
            }
        }
    }

    /// Feed an event to the machine and publish the resulting update.
    ///
    /// Returns whether the event was accepted.
    fn apply(&mut self, event: MachineEvent) -> bool {
        let Some(update) = self.machine.handle(event) else {
            return false;
        };

        if update.phase() == Phase::SecondCellRevealed {
            self.score_check_at = Some(Instant::now() + self.score_delay);
        }
        if update.phase() == Phase::Finished {
            info!(
                "Game {} round {} finished after {} moves",
                self.game_id, update.context.round, update.context.move_count
            );
        }

        self.broadcast(&update);
        true
    }

    fn broadcast(&mut self, update: &GameUpdate) {
        let game_id = self.game_id;
        self.subscribers.retain(|id, sender| {
            let delivered = sender.send(update.clone()).is_ok();
            if !delivered {
                warn!("Game {game_id}: subscriber {} went away", id.0);
            }
            delivered
        });
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
