//! Game manager for creating, running and tearing down games.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};

use super::{
    actor::{MachineActor, MachineHandle},
    config::{GameConfig, Timings},
    errors::{Lifecycle, ManagerError},
    events::EventHub,
    messages::{GameStateEvent, MachineSubscription, Subscription, SubscriptionId},
    roster::Roster,
};
use crate::board::{Board, BoardFactory, Coord};
use crate::bot::{AgentManager, RandomPicker};
use crate::game::{GameId, GameMachine, GameView, Phase, Player, PlayerId};

/// Game metadata for discovery
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub id: GameId,
    pub config: GameConfig,
    pub created_at: DateTime<Utc>,
    pub started: bool,
    pub connected_players: usize,
}

/// Mutable part of a game, guarded by the entry's mutex
struct GameState {
    roster: Roster,

    /// Board generated at creation, consumed by the first start
    pending_board: Option<Board>,

    /// Present once started
    machine: Option<MachineHandle>,

    agents: Option<AgentManager>,

    /// Task forwarding masked machine updates to the event hub
    relay: Option<JoinHandle<()>>,
}

struct GameEntry {
    id: GameId,
    config: GameConfig,
    created_at: DateTime<Utc>,
    state: Mutex<GameState>,

    /// Lock order: `state` before `hub`
    hub: Arc<Mutex<EventHub>>,
}

impl GameEntry {
    async fn summary(&self) -> GameSummary {
        let state = self.state.lock().await;
        GameSummary {
            id: self.id,
            config: self.config.clone(),
            created_at: self.created_at,
            started: state.machine.is_some(),
            connected_players: state.roster.connected().len(),
        }
    }

    async fn publish_roster(&self, state: &GameState) {
        self.hub.lock().await.publish_roster(state.roster.connected());
    }
}

/// Game manager owning every game and its actors
#[derive(Clone)]
pub struct GameManager {
    /// Active games
    games: Arc<RwLock<HashMap<GameId, Arc<GameEntry>>>>,

    /// Source of boards for new and restarted games
    board_factory: Arc<dyn BoardFactory>,

    timings: Timings,

    /// Base seed for robot pickers; unseeded robots use OS randomness
    agent_seed: Option<u64>,

    agents_spawned: Arc<AtomicU64>,
}

impl GameManager {
    /// Create a new game manager
    ///
    /// # Arguments
    ///
    /// * `board_factory` - Board generator
    /// * `timings` - Score check and robot delays
    ///
    /// # Returns
    ///
    /// * `GameManager` - New game manager instance
    pub fn new(board_factory: Arc<dyn BoardFactory>, timings: Timings) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            board_factory,
            timings,
            agent_seed: None,
            agents_spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Make robot play reproducible
    #[must_use]
    pub fn with_agent_seed(mut self, seed: u64) -> Self {
        self.agent_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn timings(&self) -> Timings {
        self.timings
    }

    async fn entry(&self, game_id: GameId) -> Result<Arc<GameEntry>, ManagerError> {
        self.games
            .read()
            .await
            .get(&game_id)
            .cloned()
            .ok_or(ManagerError::GameNotFound(game_id))
    }

    /// Create a new game.
    ///
    /// The board is generated right away so a theme that cannot fill the
    /// requested size fails here rather than on start.
    pub async fn create_game(&self, config: GameConfig) -> Result<GameId, ManagerError> {
        config.validate()?;
        let board = self.board_factory.generate(config.size, config.theme)?;

        let id = GameId::generate();
        let entry = GameEntry {
            id,
            config: config.clone(),
            created_at: Utc::now(),
            state: Mutex::new(GameState {
                roster: Roster::new(),
                pending_board: Some(board),
                machine: None,
                agents: None,
                relay: None,
            }),
            hub: Arc::new(Mutex::new(EventHub::new(id))),
        };
        self.games.write().await.insert(id, Arc::new(entry));

        info!(
            "Created game {id} ({}x{} {}, {} players, {} speed)",
            config.size, config.size, config.theme, config.player_count, config.speed
        );
        Ok(id)
    }

    /// List all games, oldest first
    pub async fn list_games(&self) -> Vec<GameSummary> {
        let entries: Vec<Arc<GameEntry>> = self.games.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in entries {
            summaries.push(entry.summary().await);
        }
        summaries.sort_by_key(|summary| summary.created_at);
        summaries
    }

    pub async fn game_summary(&self, game_id: GameId) -> Result<GameSummary, ManagerError> {
        Ok(self.entry(game_id).await?.summary().await)
    }

    /// Get active game count
    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    /// Join a game, or come back to it with a known identity.
    ///
    /// # Returns
    ///
    /// * `Player` - The member with its display name and short label
    pub async fn join_game(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Player, ManagerError> {
        let entry = self.entry(game_id).await?;
        let mut state = entry.state.lock().await;
        let (player, changed) = state.roster.join(player_id);
        if changed {
            info!("Game {game_id}: {} joined as {}", player.id, player.display_name);
            entry.publish_roster(&state).await;
        }
        Ok(player)
    }

    /// Mark a known member as connected again
    pub async fn connect_player(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
    ) -> Result<(), ManagerError> {
        self.set_connected(game_id, player_id, true).await
    }

    /// Drop a member from the roster view. The game and its robots keep
    /// running.
    pub async fn disconnect_player(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
    ) -> Result<(), ManagerError> {
        self.set_connected(game_id, player_id, false).await
    }

    async fn set_connected(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
        connected: bool,
    ) -> Result<(), ManagerError> {
        let entry = self.entry(game_id).await?;
        let mut state = entry.state.lock().await;
        let result = if connected {
            state.roster.connect(player_id)
        } else {
            state.roster.disconnect(player_id)
        };

        match result {
            None => Err(ManagerError::PlayerNotFound {
                game: game_id,
                player: player_id.clone(),
            }),
            Some(changed) => {
                if changed {
                    debug!("Game {game_id}: {player_id} connected={connected}");
                    entry.publish_roster(&state).await;
                }
                Ok(())
            }
        }
    }

    /// Connected members in join order
    pub async fn roster(&self, game_id: GameId) -> Result<Vec<Player>, ManagerError> {
        let entry = self.entry(game_id).await?;
        let state = entry.state.lock().await;
        Ok(state.roster.connected())
    }

    /// Start a game.
    ///
    /// Seats connected humans in join order, fills the remaining seats with
    /// robots when the game allows them and starts the machine.
    pub async fn start_game(&self, game_id: GameId) -> Result<(), ManagerError> {
        let entry = self.entry(game_id).await?;
        let mut state = entry.state.lock().await;
        if state.machine.is_some() {
            return Err(ManagerError::InvalidLifecycleState(Lifecycle::AlreadyStarted));
        }

        let config = &entry.config;
        let mut seats = state.roster.seat_humans(config.player_count);
        if seats.is_empty() && !config.with_agents {
            return Err(ManagerError::InvalidLifecycleState(Lifecycle::NoPlayers));
        }

        let mut robots = Vec::new();
        if config.with_agents {
            while seats.len() < config.player_count {
                let robot = state.roster.add_agent();
                seats.push(robot.id.clone());
                robots.push(robot.id);
            }
        }

        let board = match state.pending_board.take() {
            Some(board) => board,
            None => self.board_factory.generate(config.size, config.theme)?,
        };
        let machine = match GameMachine::new(board, seats) {
            Ok(machine) => machine,
            Err(e) => {
                state.roster.remove_agents(&robots);
                return Err(e.into());
            }
        };
        let (actor, handle) = MachineActor::new(
            game_id,
            machine,
            self.timings.score_check_delay(config.speed),
        );
        tokio::spawn(actor.run());

        self.wire_started(&entry, &mut state, handle, &robots).await?;
        info!(
            "Started game {game_id} with {} robots",
            state.agents.as_ref().map_or(0, AgentManager::agent_count)
        );
        Ok(())
    }

    /// Hook a running machine up to the event hub and its robots. On
    /// failure the machine is closed and the game is left unstarted.
    async fn wire_started(
        &self,
        entry: &GameEntry,
        state: &mut GameState,
        handle: MachineHandle,
        robots: &[PlayerId],
    ) -> Result<(), ManagerError> {
        match self.attach(entry, &handle, robots).await {
            Ok((relay, agents)) => {
                state.relay = Some(relay);
                if agents.is_some() {
                    state.agents = agents;
                    entry.publish_roster(state).await;
                }
                state.machine = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!("Game {}: start failed, rolling back: {e}", entry.id);
                if handle.close().await.is_err() {
                    debug!("Game {}: machine already stopped", entry.id);
                }
                state.roster.remove_agents(robots);
                entry.hub.lock().await.reset_state();
                Err(e)
            }
        }
    }

    async fn attach(
        &self,
        entry: &GameEntry,
        handle: &MachineHandle,
        robots: &[PlayerId],
    ) -> Result<(JoinHandle<()>, Option<AgentManager>), ManagerError> {
        // relay first so observers see the very first robot move
        let subscription = handle.subscribe().await?;
        let relay = tokio::spawn(relay_updates(
            entry.id,
            Arc::clone(&entry.hub),
            subscription,
        ));
        if robots.is_empty() {
            return Ok((relay, None));
        }

        let mut agents =
            AgentManager::new(entry.id, handle.clone(), self.timings.agent_action_delay);
        for robot in robots {
            if let Err(e) = agents.spawn_agent(robot.clone(), self.picker()).await {
                agents.shutdown().await;
                relay.abort();
                return Err(e.into());
            }
        }
        Ok((relay, Some(agents)))
    }

    fn picker(&self) -> RandomPicker {
        match self.agent_seed {
            Some(seed) => {
                let offset = self.agents_spawned.fetch_add(1, Ordering::Relaxed);
                RandomPicker::seeded(seed.wrapping_add(offset))
            }
            None => RandomPicker::from_os_rng(),
        }
    }

    async fn machine(&self, entry: &GameEntry) -> Result<MachineHandle, ManagerError> {
        entry
            .state
            .lock()
            .await
            .machine
            .clone()
            .ok_or(ManagerError::InvalidLifecycleState(Lifecycle::NotStarted))
    }

    /// Submit a reveal for a member. Moves the machine rejects are dropped
    /// silently.
    pub async fn reveal_cell(
        &self,
        game_id: GameId,
        player_id: &PlayerId,
        row: usize,
        col: usize,
    ) -> Result<(), ManagerError> {
        let entry = self.entry(game_id).await?;
        let machine = {
            let state = entry.state.lock().await;
            if !state.roster.contains(player_id) {
                return Err(ManagerError::PlayerNotFound {
                    game: game_id,
                    player: player_id.clone(),
                });
            }
            state
                .machine
                .clone()
                .ok_or(ManagerError::InvalidLifecycleState(Lifecycle::NotStarted))?
        };

        machine
            .reveal(player_id.clone(), Coord::new(row, col))
            .await?;
        Ok(())
    }

    /// Play another round on a fresh board once the current one is finished
    pub async fn restart_game(&self, game_id: GameId) -> Result<(), ManagerError> {
        let entry = self.entry(game_id).await?;
        let state = entry.state.lock().await;
        let machine = state
            .machine
            .clone()
            .ok_or(ManagerError::InvalidLifecycleState(Lifecycle::NotStarted))?;

        if machine.current().await?.phase() != Phase::Finished {
            return Err(ManagerError::InvalidLifecycleState(Lifecycle::NotFinished));
        }

        let board = self
            .board_factory
            .generate(entry.config.size, entry.config.theme)?;
        if let Some(agents) = &state.agents {
            agents.reset().await;
        }
        if !machine.restart(board).await? {
            return Err(ManagerError::InvalidLifecycleState(Lifecycle::NotFinished));
        }

        info!("Restarted game {game_id}");
        Ok(())
    }

    /// Masked state of a started game
    pub async fn game_state(&self, game_id: GameId) -> Result<GameView, ManagerError> {
        let entry = self.entry(game_id).await?;
        let machine = self.machine(&entry).await?;
        let update = machine.current().await?;
        Ok(GameView::from(update.context.as_ref()))
    }

    /// Subscribe to roster changes. The current roster arrives first.
    pub async fn subscribe_roster(
        &self,
        game_id: GameId,
    ) -> Result<Subscription<Vec<Player>>, ManagerError> {
        let entry = self.entry(game_id).await?;
        let state = entry.state.lock().await;
        let subscription = entry
            .hub
            .lock()
            .await
            .subscribe_roster(state.roster.connected());
        Ok(subscription)
    }

    /// Subscribe to game state changes. The latest state (or `NotStarted`)
    /// arrives first.
    pub async fn subscribe_game_state(
        &self,
        game_id: GameId,
    ) -> Result<Subscription<GameStateEvent>, ManagerError> {
        let entry = self.entry(game_id).await?;
        let subscription = entry.hub.lock().await.subscribe_state();
        Ok(subscription)
    }

    /// Remove a subscription of either kind. Unknown ids are ignored.
    pub async fn unsubscribe(
        &self,
        game_id: GameId,
        subscription: SubscriptionId,
    ) -> Result<(), ManagerError> {
        let entry = self.entry(game_id).await?;
        if !entry.hub.lock().await.unsubscribe(subscription) {
            debug!("Game {game_id}: unsubscribe of unknown id {}", subscription.0);
        }
        Ok(())
    }

    /// Tear a game down: robots stop, pending reveals and score checks are
    /// cancelled and every subscription stream ends.
    pub async fn close_game(&self, game_id: GameId) -> Result<(), ManagerError> {
        let entry = self
            .games
            .write()
            .await
            .remove(&game_id)
            .ok_or(ManagerError::GameNotFound(game_id))?;

        let mut state = entry.state.lock().await;
        if let Some(agents) = state.agents.take() {
            agents.shutdown().await;
        }
        if let Some(machine) = state.machine.take()
            && machine.close().await.is_err()
        {
            warn!("Game {game_id}: machine already stopped");
        }
        if let Some(relay) = state.relay.take()
            && let Err(e) = relay.await
        {
            warn!("Game {game_id}: relay task failed: {e}");
        }
        entry.hub.lock().await.close();

        info!("Closed game {game_id}");
        Ok(())
    }

    /// Close every game
    pub async fn shutdown(&self) {
        let ids: Vec<GameId> = self.games.read().await.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.close_game(id).await {
                debug!("Shutdown: {e}");
            }
        }
    }
}

/// Forward machine updates to the event hub as masked views
async fn relay_updates(
    game_id: GameId,
    hub: Arc<Mutex<EventHub>>,
    mut subscription: MachineSubscription,
) {
    let view = Arc::new(GameView::from(subscription.current.context.as_ref()));
    hub.lock().await.publish_state(view);

    while let Some(update) = subscription.updates.recv().await {
        let view = Arc::new(GameView::from(update.context.as_ref()));
        hub.lock().await.publish_state(view);
    }
    debug!("Game {game_id}: state relay finished");
}
