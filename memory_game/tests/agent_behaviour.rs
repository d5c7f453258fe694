//! Robot behaviour against a real machine, driven synchronously.

use memory_game::{
    Board, BoardFactory, Cause, Coord, GameMachine, GameUpdate, MachineEvent, Phase, PlayerId,
    ShuffledBoardFactory, Theme,
    bot::{FirstPicker, IndexPicker, MemoryAgent, RandomPicker, RevealIntent},
};
use std::collections::VecDeque;

/// Feeds updates to robots in emission order and applies their intents,
/// checking each intent is legal when it is emitted.
struct Table<P> {
    machine: GameMachine,
    agents: Vec<MemoryAgent<P>>,
    pending: VecDeque<GameUpdate>,
    robot_moves: Vec<Coord>,
}

impl<P: IndexPicker> Table<P> {
    fn new(machine: GameMachine, agents: Vec<MemoryAgent<P>>) -> Self {
        let pending = VecDeque::from([machine.current()]);
        Self {
            machine,
            agents,
            pending,
            robot_moves: Vec::new(),
        }
    }

    fn human_reveal(&mut self, player: &str, row: usize, col: usize) {
        let update = self
            .machine
            .handle(MachineEvent::RevealCell {
                player: player.into(),
                coord: Coord::new(row, col),
            })
            .expect("human reveal should be accepted");
        self.pending.push_back(update);
    }

    fn check_score(&mut self) {
        let update = self
            .machine
            .handle(MachineEvent::CheckScore)
            .expect("two cells should be face up");
        self.pending.push_back(update);
    }

    /// Run until nothing more happens without outside input
    fn settle(&mut self) {
        loop {
            while let Some(update) = self.pending.pop_front() {
                let intents: Vec<RevealIntent> = self
                    .agents
                    .iter_mut()
                    .filter_map(|agent| agent.observe(&update))
                    .collect();
                for intent in intents {
                    self.apply(intent);
                }
            }
            if self.machine.phase() == Phase::SecondCellRevealed && self.is_robot_turn() {
                self.check_score();
            } else {
                break;
            }
        }
    }

    fn is_robot_turn(&self) -> bool {
        let current = self.machine.context().current_player();
        self.agents.iter().any(|agent| agent.player() == current)
    }

    fn apply(&mut self, intent: RevealIntent) {
        let ctx = self.machine.context();
        assert_eq!(&intent.player, ctx.current_player());
        assert!(
            !ctx.is_face_up(intent.coord),
            "robot chose face-up cell {}",
            intent.coord
        );
        assert_eq!(intent.round, ctx.round);

        self.robot_moves.push(intent.coord);
        let update = self
            .machine
            .handle(MachineEvent::RevealCell {
                player: intent.player,
                coord: intent.coord,
            })
            .expect("legal intent should be accepted");
        self.pending.push_back(update);
    }

    fn score(&self, player: &str) -> u32 {
        self.machine.context().score_of(&PlayerId::new(player))
    }
}

fn human_vs_robot(rows: &[&[&str]]) -> Table<FirstPicker> {
    let board = Board::from_strs(rows).unwrap();
    let machine = GameMachine::new(board.clone(), vec!["joe".into(), "robot".into()]).unwrap();
    let robot = MemoryAgent::new("robot".into(), &board, FirstPicker);
    Table::new(machine, vec![robot])
}

#[test]
fn test_reveals_new_cells_when_no_match_known() {
    let mut table = human_vs_robot(&[&["1", "2", "3", "4"], &["1", "2", "3", "4"]]);
    table.settle();
    table.human_reveal("joe", 0, 0);
    table.human_reveal("joe", 0, 1);
    table.check_score();
    table.settle();

    assert_eq!(table.robot_moves[..2], [Coord::new(0, 2), Coord::new(0, 3)]);
    assert_eq!(table.score("robot"), 0);
}

#[test]
fn test_reveals_match_right_after_discovery() {
    let mut table = human_vs_robot(&[&["1", "2"], &["2", "1"]]);
    table.human_reveal("joe", 0, 0);
    table.human_reveal("joe", 0, 1);
    table.check_score();
    table.settle();

    // discovers the second "2" and goes straight for the first
    assert_eq!(table.robot_moves[..2], [Coord::new(1, 0), Coord::new(0, 1)]);
    assert_eq!(table.score("robot"), 1);
    assert!(table.machine.context().is_captured(Coord::new(0, 1)));
}

#[test]
fn test_never_targets_cells_captured_by_opponent() {
    let mut table = human_vs_robot(&[&["1", "1", "2", "2"], &["3", "3", "4", "4"]]);
    table.human_reveal("joe", 0, 0);
    table.human_reveal("joe", 0, 1);
    table.check_score();
    table.settle();

    assert_eq!(table.score("joe"), 1);
    assert!(!table.robot_moves.contains(&Coord::new(0, 0)));
    assert!(!table.robot_moves.contains(&Coord::new(0, 1)));
    assert_eq!(table.robot_moves[..2], [Coord::new(0, 2), Coord::new(0, 3)]);
    assert_eq!(table.score("robot"), 1);
}

#[test]
fn test_robot_plays_pair_learned_while_exploring() {
    let mut table = human_vs_robot(&[&["a", "b", "c", "a"], &["d", "b", "c", "d"]]);
    table.human_reveal("joe", 0, 0);
    table.human_reveal("joe", 0, 1);
    table.check_score();
    table.settle();

    // exploring turns up the second "a" as the robot's second card
    assert_eq!(table.robot_moves, [Coord::new(0, 2), Coord::new(0, 3)]);
    assert_eq!(table.score("robot"), 0);

    table.human_reveal("joe", 1, 0);
    table.human_reveal("joe", 1, 1);
    table.check_score();
    table.settle();

    assert_eq!(table.robot_moves[2..], [Coord::new(0, 0), Coord::new(0, 3)]);
    assert_eq!(table.score("robot"), 1);
}

#[test]
fn test_robots_alone_always_finish() {
    for seed in 0..20u64 {
        let board = ShuffledBoardFactory::seeded(seed)
            .generate(6, Theme::Symbolic)
            .unwrap();
        let players: Vec<PlayerId> = (0..3).map(|n| PlayerId::new(format!("r{n}"))).collect();
        let agents = players
            .iter()
            .enumerate()
            .map(|(n, id)| {
                MemoryAgent::new(id.clone(), &board, RandomPicker::seeded(seed * 10 + n as u64))
            })
            .collect();
        let machine = GameMachine::new(board, players).unwrap();
        let mut table = Table::new(machine, agents);
        table.settle();

        let ctx = table.machine.context();
        assert_eq!(ctx.phase, Phase::Finished, "seed {seed} stalled");
        assert_eq!(ctx.scores.values().sum::<u32>(), 18);
        // a perfect memory never needs more than two looks per cell
        assert!(ctx.move_count as usize <= 2 * ctx.board.cell_count());
    }
}

#[test]
fn test_restart_starts_a_fresh_memory() {
    let board = Board::from_strs(&[&["1", "2"], &["2", "1"]]).unwrap();
    let machine = GameMachine::new(board.clone(), vec!["robot".into()]).unwrap();
    let robot = MemoryAgent::new("robot".into(), &board, FirstPicker);
    let mut table = Table::new(machine, vec![robot]);
    table.settle();
    assert_eq!(table.machine.phase(), Phase::Finished);

    let fresh = Board::from_strs(&[&["9", "8"], &["8", "9"]]).unwrap();
    let update = table.machine.handle(MachineEvent::Restart(fresh)).unwrap();
    assert_eq!(update.cause, Cause::Restarted);
    table.pending.push_back(update);
    let moves_before = table.robot_moves.len();
    table.settle();

    assert_eq!(table.machine.phase(), Phase::Finished);
    assert_eq!(table.machine.context().round, 1);
    assert_eq!(table.robot_moves[moves_before], Coord::new(0, 0));
}
