//! Fan-out of roster and game state events to manager-level subscribers.

use log::debug;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::mpsc;

use super::messages::{GameStateEvent, Subscription, SubscriptionId};
use crate::game::{GameId, GameView, Player};

type Listeners<T> = HashMap<SubscriptionId, mpsc::UnboundedSender<T>>;

/// Subscriber registry for one game
#[derive(Debug)]
pub struct EventHub {
    game_id: GameId,
    next_id: u64,
    roster_listeners: Listeners<Vec<Player>>,
    state_listeners: Listeners<GameStateEvent>,

    /// Last published state, replayed to late subscribers
    latest_view: Option<Arc<GameView>>,
}

impl EventHub {
    #[must_use]
    pub fn new(game_id: GameId) -> Self {
        Self {
            game_id,
            next_id: 0,
            roster_listeners: HashMap::new(),
            state_listeners: HashMap::new(),
            latest_view: None,
        }
    }

    fn allocate_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a roster listener; `current` is delivered first.
    pub fn subscribe_roster(&mut self, current: Vec<Player>) -> Subscription<Vec<Player>> {
        let id = self.allocate_id();
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(current);
        self.roster_listeners.insert(id, sender);
        Subscription::new(id, self.game_id, receiver)
    }

    /// Register a state listener. The latest known state (or `NotStarted`)
    /// is delivered first.
    pub fn subscribe_state(&mut self) -> Subscription<GameStateEvent> {
        let id = self.allocate_id();
        let (sender, receiver) = mpsc::unbounded_channel();
        let first = match &self.latest_view {
            Some(view) => GameStateEvent::Changed(Arc::clone(view)),
            None => GameStateEvent::NotStarted,
        };
        let _ = sender.send(first);
        self.state_listeners.insert(id, sender);
        Subscription::new(id, self.game_id, receiver)
    }

    /// Remove a listener of either kind. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.roster_listeners.remove(&id).is_some() || self.state_listeners.remove(&id).is_some()
    }

    pub fn publish_roster(&mut self, roster: Vec<Player>) {
        fan_out(self.game_id, &mut self.roster_listeners, &roster);
    }

    pub fn publish_state(&mut self, view: Arc<GameView>) {
        fan_out(
            self.game_id,
            &mut self.state_listeners,
            &GameStateEvent::Changed(Arc::clone(&view)),
        );
        self.latest_view = Some(view);
    }

    /// Forget the published state and tell listeners the game is not
    /// running
    pub fn reset_state(&mut self) {
        self.latest_view = None;
        fan_out(self.game_id, &mut self.state_listeners, &GameStateEvent::NotStarted);
    }

    #[must_use]
    pub fn latest_view(&self) -> Option<Arc<GameView>> {
        self.latest_view.clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.roster_listeners.len() + self.state_listeners.len()
    }

    /// Drop every listener, ending their streams
    pub fn close(&mut self) {
        self.roster_listeners.clear();
        self.state_listeners.clear();
    }
}

fn fan_out<T: Clone>(game_id: GameId, listeners: &mut Listeners<T>, event: &T) {
    listeners.retain(|id, sender| {
        let delivered = sender.send(event.clone()).is_ok();
        if !delivered {
            debug!("Game {game_id}: dropping closed subscription {}", id.0);
        }
        delivered
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::game::GameMachine;

    fn view() -> Arc<GameView> {
        let board = Board::from_strs(&[&["1", "1"]]).unwrap();
        let machine = GameMachine::new(board, vec!["a".into()]).unwrap();
        Arc::new(GameView::from(machine.context()))
    }

    #[test]
    fn test_state_subscription_starts_with_not_started() {
        let mut hub = EventHub::new(GameId::generate());
        let mut sub = hub.subscribe_state();
        assert_eq!(sub.try_recv(), Some(GameStateEvent::NotStarted));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_late_state_subscriber_gets_latest_view() {
        let mut hub = EventHub::new(GameId::generate());
        let view = view();
        hub.publish_state(Arc::clone(&view));

        let mut sub = hub.subscribe_state();
        assert_eq!(sub.try_recv(), Some(GameStateEvent::Changed(view)));
    }

    #[test]
    fn test_roster_subscription_replays_current() {
        let mut hub = EventHub::new(GameId::generate());
        let mut sub = hub.subscribe_roster(vec![]);
        assert_eq!(sub.try_recv(), Some(vec![]));

        hub.publish_roster(vec![]);
        assert_eq!(sub.try_recv(), Some(vec![]));
    }

    #[test]
    fn test_unsubscribe_and_pruning() {
        let mut hub = EventHub::new(GameId::generate());
        let sub = hub.subscribe_roster(vec![]);
        let state = hub.subscribe_state();
        assert_eq!(hub.listener_count(), 2);

        assert!(hub.unsubscribe(sub.id()));
        assert!(!hub.unsubscribe(sub.id()));

        drop(state);
        hub.publish_state(view());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_close_ends_streams() {
        let mut hub = EventHub::new(GameId::generate());
        let mut sub = hub.subscribe_state();
        sub.try_recv();
        hub.close();
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn test_reset_state_replays_not_started() {
        let mut hub = EventHub::new(GameId::generate());
        let mut sub = hub.subscribe_state();
        sub.try_recv();
        hub.publish_state(view());
        sub.try_recv();

        hub.reset_state();
        assert_eq!(sub.try_recv(), Some(GameStateEvent::NotStarted));
        assert!(hub.latest_view().is_none());
        let mut late = hub.subscribe_state();
        assert_eq!(late.try_recv(), Some(GameStateEvent::NotStarted));
    }
}
