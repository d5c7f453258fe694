//! Headless memory game runner.
//!
//! Plays robot-only games through the `GameManager`, restarting each game
//! between rounds, and logs the outcome of every round.

mod config;

use std::{collections::HashMap, sync::Arc};

use anyhow::{Error, anyhow};
use ctrlc::set_handler;
use log::info;
use memory_game::{
    BoardFactory, GameId, GameManager, GameStateEvent, GameView, Phase, PlayerId,
    ShuffledBoardFactory, Subscription,
};
use pico_args::Arguments;
use tokio::task::JoinSet;

use config::{Overrides, SimConfig};

const HELP: &str = "\
Play robot-only memory games

USAGE:
  memory_sim [OPTIONS]

OPTIONS:
  --size       N           Board side length, even  [default: env SIM_BOARD_SIZE or 4]
  --players    N           Robots per game (1-4)    [default: env SIM_PLAYERS or 2]
  --rounds     N           Rounds per game          [default: env SIM_ROUNDS or 1]
  --games      N           Concurrent games         [default: env SIM_GAMES or 1]
  --seed       N           Seed boards and robots   [default: env SIM_SEED or random]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SIM_THEME                numeric or symbolic
  SIM_SPEED                normal or relaxing
  SCORE_DELAY_NORMAL_MS    Pair face-up time at normal speed
  SCORE_DELAY_RELAXING_MS  Pair face-up time at relaxing speed
  AGENT_ACTION_DELAY_MS    Robot thinking time
  RUST_LOG                 Log filter [default: info]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        size: pargs.opt_value_from_str("--size")?,
        players: pargs.opt_value_from_str("--players")?,
        rounds: pargs.opt_value_from_str("--rounds")?,
        games: pargs.opt_value_from_str("--games")?,
        seed: pargs.opt_value_from_str("--seed")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let config = SimConfig::from_env(overrides)?;
    config.validate()?;
    info!(
        "Simulating {} game(s) of {} round(s) on {}x{} {} boards with {} robots",
        config.games,
        config.rounds,
        config.game.size,
        config.game.size,
        config.game.theme,
        config.game.player_count
    );

    let board_factory: Arc<dyn BoardFactory> = match config.seed {
        Some(seed) => Arc::new(ShuffledBoardFactory::seeded(seed)),
        None => Arc::new(ShuffledBoardFactory::new()),
    };
    let mut manager = GameManager::new(board_factory, config.timings);
    if let Some(seed) = config.seed {
        manager = manager.with_agent_seed(seed);
    }

    let mut games = JoinSet::new();
    for _ in 0..config.games {
        let manager = manager.clone();
        let config = config.clone();
        games.spawn(async move { play_game(&manager, &config).await });
    }

    while let Some(result) = games.join_next().await {
        result??;
    }

    manager.shutdown().await;
    info!("Simulation complete");
    Ok(())
}

/// Play every configured round of one game, then close it
async fn play_game(manager: &GameManager, config: &SimConfig) -> Result<(), Error> {
    let game_id = manager.create_game(config.game.clone()).await?;
    let mut states = manager.subscribe_game_state(game_id).await?;
    manager.start_game(game_id).await?;

    let names: HashMap<PlayerId, String> = manager
        .roster(game_id)
        .await?
        .into_iter()
        .map(|player| (player.id, player.display_name))
        .collect();

    for round in 0..config.rounds {
        let view = wait_for_finish(&mut states, round)
            .await
            .ok_or_else(|| anyhow!("game {game_id} closed during round {round}"))?;
        report(game_id, &view, &names);

        if round + 1 < config.rounds {
            manager.restart_game(game_id).await?;
        }
    }

    manager.unsubscribe(game_id, states.id()).await?;
    manager.close_game(game_id).await?;
    Ok(())
}

async fn wait_for_finish(
    states: &mut Subscription<GameStateEvent>,
    round: u32,
) -> Option<Arc<GameView>> {
    while let Some(event) = states.recv().await {
        if let GameStateEvent::Changed(view) = event
            && view.phase == Phase::Finished
            && view.round == round
        {
            return Some(view);
        }
    }
    None
}

fn report(game_id: GameId, view: &GameView, names: &HashMap<PlayerId, String>) {
    let best = view.scores.iter().map(|entry| entry.score).max().unwrap_or(0);
    let scores: Vec<String> = view
        .scores
        .iter()
        .map(|entry| {
            let name = names
                .get(&entry.player)
                .map_or(entry.player.as_str(), String::as_str);
            let marker = if entry.score == best { " *" } else { "" };
            format!("{name}: {}{marker}", entry.score)
        })
        .collect();

    info!(
        "Game {game_id} round {} finished in {} moves | {}",
        view.round + 1,
        view.move_count,
        scores.join(", ")
    );
}
