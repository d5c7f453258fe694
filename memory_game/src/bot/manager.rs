//! Robot seats of one game and the pacing of their reveals.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::{
    sync::{mpsc, oneshot},
    task::{JoinHandle, JoinSet},
};

use super::{
    decision::{IndexPicker, MemoryAgent},
    models::{ActionListener, RevealIntent},
};
use crate::game::{GameId, GameUpdate, PlayerId};
use crate::session::{MachineClosed, MachineHandle, MachineSubscription};

enum PacerCommand {
    /// Drop every intent still waiting out its delay
    Reset(oneshot::Sender<()>),
}

struct AgentSeat {
    player: PlayerId,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Manages the robots seated in one game.
///
/// Every robot gets its own subscription to the machine and reports its
/// intents to a single pacer task, which holds each one back for the action
/// delay before submitting it.
pub struct AgentManager {
    game_id: GameId,
    machine: MachineHandle,
    seats: Vec<AgentSeat>,
    intents: mpsc::UnboundedSender<RevealIntent>,
    pacer_control: mpsc::UnboundedSender<PacerCommand>,
    pacer: JoinHandle<()>,
}

impl AgentManager {
    /// Create an agent manager for a running game
    ///
    /// # Arguments
    ///
    /// * `game_id` - Game ID
    /// * `machine` - Handle of the game's machine
    /// * `action_delay` - Pause before each robot reveal reaches the machine
    pub fn new(game_id: GameId, machine: MachineHandle, action_delay: Duration) -> Self {
        let (intents, intent_rx) = mpsc::unbounded_channel();
        let (pacer_control, control_rx) = mpsc::unbounded_channel();
        let pacer = tokio::spawn(pace_intents(
            machine.clone(),
            intent_rx,
            control_rx,
            action_delay,
        ));

        Self {
            game_id,
            machine,
            seats: Vec::new(),
            intents,
            pacer_control,
            pacer,
        }
    }

    /// Seat a robot for `player` and start it.
    ///
    /// The robot subscribes before it starts, so it sees the current state
    /// followed by every later transition.
    pub async fn spawn_agent<P>(&mut self, player: PlayerId, picker: P) -> Result<(), MachineClosed>
    where
        P: IndexPicker + Send + 'static,
    {
        let subscription = self.machine.subscribe().await?;
        let agent = MemoryAgent::new(player.clone(), &subscription.current.context.board, picker);
        let (stop, stop_rx) = oneshot::channel();

        let runner = AgentRunner {
            agent,
            machine: self.machine.clone(),
            subscription,
            listeners: vec![self.intents.clone()],
            stop: stop_rx,
        };
        let task = tokio::spawn(runner.run());

        debug!("Game {}: robot {player} seated", self.game_id);
        self.seats.push(AgentSeat { player, stop, task });
        Ok(())
    }

    /// Get seated robot identities
    #[must_use]
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|seat| seat.player.clone()).collect()
    }

    /// Get robot count
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.seats.len()
    }

    /// Cancel every reveal still waiting out its delay. Returns once the
    /// pacer has dropped them.
    pub async fn reset(&self) {
        let (ack, ack_rx) = oneshot::channel();
        if self.pacer_control.send(PacerCommand::Reset(ack)).is_err() || ack_rx.await.is_err() {
            warn!("Game {}: intent pacer already stopped", self.game_id);
        }
    }

    /// Stop every robot and the pacer
    pub async fn shutdown(self) {
        let count = self.seats.len();
        for seat in self.seats {
            let _ = seat.stop.send(());
            if let Err(e) = seat.task.await {
                warn!("Game {}: robot {} task failed: {e}", self.game_id, seat.player);
            }
        }

        drop(self.pacer_control);
        if let Err(e) = self.pacer.await {
            warn!("Game {}: intent pacer failed: {e}", self.game_id);
        }
        info!("Game {}: {count} robots stopped", self.game_id);
    }
}

/// One robot's event loop
struct AgentRunner<P> {
    agent: MemoryAgent<P>,
    machine: MachineHandle,
    subscription: MachineSubscription,
    listeners: Vec<ActionListener>,
    stop: oneshot::Receiver<()>,
}

impl<P: IndexPicker> AgentRunner<P> {
    async fn run(mut self) {
        let current = self.subscription.current.clone();
        self.step(&current);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.stop => break,

                update = self.subscription.updates.recv() => match update {
                    Some(update) => self.step(&update),
                    None => break,
                },
            }
        }

        self.machine.unsubscribe(self.subscription.id).await;
        debug!("Robot {} stopped", self.agent.player());
    }

    fn step(&mut self, update: &GameUpdate) {
        if let Some(intent) = self.agent.observe(update) {
            self.listeners
                .retain(|listener| listener.send(intent.clone()).is_ok());
        }
    }
}

/// Hold each intent for `delay`, then submit it to the machine.
async fn pace_intents(
    machine: MachineHandle,
    mut intents: mpsc::UnboundedReceiver<RevealIntent>,
    mut control: mpsc::UnboundedReceiver<PacerCommand>,
    delay: Duration,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            command = control.recv() => match command {
                Some(PacerCommand::Reset(ack)) => {
                    in_flight.abort_all();
                    let _ = ack.send(());
                }
                None => break,
            },

            intent = intents.recv() => match intent {
                Some(intent) => {
                    let machine = machine.clone();
                    in_flight.spawn(async move {
                        tokio::time::sleep(delay).await;
                        if machine
                            .reveal_in_round(intent.player, intent.coord, intent.round)
                            .await
                            .is_err()
                        {
                            debug!("Game {}: robot reveal after close", machine.game_id());
                        }
                    });
                }
                None => break,
            },

            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    in_flight.shutdown().await;
}
