//! The persistence port: the narrow interface the room layer needs from
//! durable storage.
//!
//! Gameplay never depends on persistence succeeding. The actor computes
//! the new game state to a consistent point first, then awaits the
//! append; a failure is logged and swallowed, and the in-memory game
//! remains authoritative. The one operation with stronger requirements
//! is [`Persistence::credit_balance`], which implementations must make
//! idempotent per transaction id (the actor may retry after a crash).

#![allow(async_fn_in_trait)]

use ludorum_engine::{ChatEntry, GameCode, TurnEvent, UserId};

/// A tournament row, looked up by game code when an unknown code
/// connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tournament {
    /// Opaque id used to key chat and turn-log appends.
    pub id: String,
    /// Lifecycle of the tournament row.
    pub status: TournamentStatus,
    /// Table size the tournament was scheduled for (2 or 4).
    pub max_players: u8,
    /// Amount credited to the winner's balance, in minor units.
    pub prize: i64,
}

/// Tournament lifecycle as stored. Anything not ACTIVE cannot seed a
/// room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentStatus {
    Active,
    Completed,
}

/// Application settings read at room creation.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    /// Overrides the auto-start delay for full tournament rooms, in
    /// milliseconds.
    pub auto_start_delay_ms: Option<u64>,
}

/// A persistence operation failed. The message is for the log line; the
/// caller carries on.
#[derive(Debug, Clone, thiserror::Error)]
#[error("persistence: {0}")]
pub struct PersistenceError(pub String);

/// Durable storage as the room layer sees it: a tournament lookup, two
/// append-only logs, a balance credit, and a settings read.
pub trait Persistence: Send + Sync + 'static {
    /// Looks up a tournament by game code. `Ok(None)` means no such
    /// tournament; the registry then creates a manual room.
    fn find_tournament(
        &self,
        code: &GameCode,
    ) -> impl std::future::Future<Output = Result<Option<Tournament>, PersistenceError>> + Send;

    /// Appends one chat message to the tournament's chat log.
    fn append_chat(
        &self,
        tournament_id: &str,
        entry: &ChatEntry,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Appends one structured turn event to the tournament's history.
    fn append_turn_event(
        &self,
        tournament_id: &str,
        event: &TurnEvent,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Credits a user's balance. Must be idempotent per
    /// `transaction_id`.
    fn credit_balance(
        &self,
        user_id: &UserId,
        amount: i64,
        transaction_id: &str,
    ) -> impl std::future::Future<Output = Result<(), PersistenceError>> + Send;

    /// Reads application settings. Defaults apply on failure.
    fn load_settings(&self) -> impl std::future::Future<Output = Result<AppSettings, PersistenceError>> + Send {
        async { Ok(AppSettings::default()) }
    }
}

/// A persistence port that stores nothing: every code is a manual room
/// and every append is accepted and dropped. The default for local play
/// and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl Persistence for NoPersistence {
    async fn find_tournament(
        &self,
        _code: &GameCode,
    ) -> Result<Option<Tournament>, PersistenceError> {
        Ok(None)
    }

    async fn append_chat(
        &self,
        _tournament_id: &str,
        _entry: &ChatEntry,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn append_turn_event(
        &self,
        _tournament_id: &str,
        _event: &TurnEvent,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn credit_balance(
        &self,
        _user_id: &UserId,
        _amount: i64,
        _transaction_id: &str,
    ) -> Result<(), PersistenceError> {
        Ok(())
    }
}
