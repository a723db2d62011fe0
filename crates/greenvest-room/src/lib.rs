//! Room state and the coordinator that owns it.
//!
//! Every room lives inside one coordinator task (actor model). Connection
//! handlers talk to it through a [`CoordinatorHandle`] and receive
//! broadcasts and acks on their own [`ClientSender`] channel.
//!
//! # Key types
//!
//! - [`Coordinator`]: the synchronous room registry and its rules
//! - [`CoordinatorHandle`]: send commands to the running coordinator
//! - [`Room`]: one game session (host, players, sectors)
//! - [`RoomPhase`]: where a room is in its game
//! - [`RoomConfig`]: player limit, budget, sectors, idle eviction

mod actor;
mod config;
mod coordinator;
mod error;
mod room;
pub mod scoring;

pub use actor::{
    ClientSender, CoordinatorHandle, Outbound, spawn_coordinator, spawn_coordinator_with_rng,
};
pub use config::{RoomConfig, RoomPhase, SectorSpec, default_sectors};
pub use coordinator::{Broadcast, Coordinator, Outcome, RoomInfo};
pub use error::RoomError;
pub use room::{Host, Player, Room, Sector};
