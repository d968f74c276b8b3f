//! Room-layer errors: why a connection could not be attached to a room.

use ludorum_engine::GameCode;

/// Errors surfaced to the connection handler when joining or addressing
/// a room. Everything else in the room layer is a silent drop.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    /// The room actor is gone (evicted between lookup and send).
    #[error("room {0} is no longer available")]
    Unavailable(GameCode),

    /// The game already finished; late joins are rejected.
    #[error("game {0} has already finished")]
    GameOver(GameCode),

    /// All seats are taken.
    #[error("game {0} is full")]
    RoomFull(GameCode),

    /// The game is running and the user holds no seat in it.
    #[error("game {0} is already in progress")]
    InProgress(GameCode),

    /// The code belongs to a tournament that has completed.
    #[error("tournament for {0} has completed")]
    TournamentOver(GameCode),

    /// The tournament lookup itself failed.
    #[error("room lookup failed: {0}")]
    Lookup(String),
}
