//! # ludorum-room
//!
//! The concurrency core: one actor task per live game, a turn controller
//! driven by the actor's own clock, the process-wide room registry, and
//! the persistence port everything above the engine shares.

mod config;
mod error;
mod ports;
mod registry;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use ports::{
    AppSettings, NoPersistence, Persistence, PersistenceError, Tournament, TournamentStatus,
};
pub use registry::{DiceFactory, Registry};
pub use room::{
    spawn_room, PeerWriter, RegistryEvent, RoomCommand, RoomHandle, RoomInfo, RoomSeed,
};
