//! Game sessions: one actor per running game plus the manager owning them.

pub mod actor;
pub mod config;
pub mod errors;
pub mod events;
pub mod manager;
pub mod messages;
pub mod roster;

pub use actor::{MachineActor, MachineHandle};
pub use config::{ConfigError, GameConfig, GameSpeed, Timings};
pub use errors::{Lifecycle, MachineClosed, ManagerError};
pub use events::EventHub;
pub use manager::{GameManager, GameSummary};
pub use messages::{
    GameStateEvent, MachineMessage, MachineSubscription, SubscriberId, Subscription,
    SubscriptionId,
};
pub use roster::Roster;
