//! Per-game membership: humans in join order plus robot seats.

use crate::game::{Player, PlayerId};

#[derive(Debug, Clone)]
struct Member {
    player: Player,
    connected: bool,
}

/// Everyone who ever joined a game.
///
/// Disconnected humans stay known so they keep their labels when they come
/// back, but they are left out of [`Roster::connected`].
#[derive(Debug, Default)]
pub struct Roster {
    members: Vec<Member>,
    humans_joined: usize,
    agents_joined: usize,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a human or reconnect a known one.
    ///
    /// # Returns
    ///
    /// * `(Player, bool)` - the member and whether the connected roster changed
    pub fn join(&mut self, id: PlayerId) -> (Player, bool) {
        if let Some(member) = self.members.iter_mut().find(|m| m.player.id == id) {
            let changed = !member.connected;
            member.connected = true;
            return (member.player.clone(), changed);
        }

        self.humans_joined += 1;
        let player = Player {
            id,
            display_name: format!("Player {}", self.humans_joined),
            short_label: format!("P{}", self.humans_joined),
            is_agent: false,
        };
        self.members.push(Member {
            player: player.clone(),
            connected: true,
        });
        (player, true)
    }

    /// Add a robot with a fresh identity
    pub fn add_agent(&mut self) -> Player {
        self.agents_joined += 1;
        let player = Player {
            id: PlayerId::generate(),
            display_name: format!("Robot {}", self.agents_joined),
            short_label: format!("R{}", self.agents_joined),
            is_agent: true,
        };
        self.members.push(Member {
            player: player.clone(),
            connected: true,
        });
        player
    }

    /// Take back robots added for a start that did not go through, freeing
    /// their labels for the next attempt.
    pub fn remove_agents(&mut self, ids: &[PlayerId]) {
        let before = self.members.len();
        self.members
            .retain(|m| !(m.player.is_agent && ids.contains(&m.player.id)));
        self.agents_joined -= before - self.members.len();
    }

    /// Mark a known member as connected. Returns `None` for unknown ids.
    pub fn connect(&mut self, id: &PlayerId) -> Option<bool> {
        self.set_connected(id, true)
    }

    /// Mark a known member as gone. Returns `None` for unknown ids.
    pub fn disconnect(&mut self, id: &PlayerId) -> Option<bool> {
        self.set_connected(id, false)
    }

    fn set_connected(&mut self, id: &PlayerId, connected: bool) -> Option<bool> {
        let member = self.members.iter_mut().find(|m| &m.player.id == id)?;
        let changed = member.connected != connected;
        member.connected = connected;
        Some(changed)
    }

    #[must_use]
    pub fn contains(&self, id: &PlayerId) -> bool {
        self.members.iter().any(|m| &m.player.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.members
            .iter()
            .map(|m| &m.player)
            .find(|player| &player.id == id)
    }

    /// Connected members in join order
    #[must_use]
    pub fn connected(&self) -> Vec<Player> {
        self.members
            .iter()
            .filter(|m| m.connected)
            .map(|m| m.player.clone())
            .collect()
    }

    /// Up to `limit` connected humans, earliest joiners first
    #[must_use]
    pub fn seat_humans(&self, limit: usize) -> Vec<PlayerId> {
        self.members
            .iter()
            .filter(|m| m.connected && !m.player.is_agent)
            .take(limit)
            .map(|m| m.player.id.clone())
            .collect()
    }
}
