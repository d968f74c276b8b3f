//! # ludorum
//!
//! The authoritative realtime Ludo server. Clients connect over a
//! WebSocket at `/<GAMECODE>`, authenticate with a bearer token, and
//! from then on are strictly display layers: the server owns the
//! canonical game, validates every action, drives the turn timers, and
//! broadcasts full-state snapshots.
//!
//! This meta-crate ties the layers together: transport → session →
//! registry → room actor → rule engine. Deployments supply the two
//! external ports (identity and persistence) and call
//! [`ServerBuilder`].

mod error;
mod handler;
mod server;

pub use error::LudorumError;
pub use server::{Server, ServerBuilder};

/// Everything a deployment needs in one import.
pub mod prelude {
    pub use crate::{LudorumError, Server, ServerBuilder};

    pub use ludorum_engine::{
        Color, DiceRoller, Game, GameCode, GameKind, GameStatus, Piece, PieceState, Player,
        Rules, SequenceDice, ThreadDice, TurnEvent, UserId,
    };
    pub use ludorum_protocol::{
        ClientAction, Codec, JsonCodec, ServerFrame, CLOSE_AUTH_FAILURE, CLOSE_SERVER_ERROR,
    };
    pub use ludorum_room::{
        AppSettings, NoPersistence, Persistence, PersistenceError, Registry, RoomConfig,
        RoomError, RoomHandle, Tournament, TournamentStatus,
    };
    pub use ludorum_session::{Identity, Session, SessionError, SessionState, UserProfile};
    pub use ludorum_transport::{TransportError, WsListener};
}
