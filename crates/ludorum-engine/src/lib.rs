//! # ludorum-engine
//!
//! The pure Ludo rule engine: board geometry, the canonical game record,
//! and every operation that mutates it. No I/O, no timers, no async; the
//! only non-determinism is dice generation, injected through the
//! [`DiceRoller`] trait.
//!
//! The room actor in `ludorum-room` owns one [`Game`] and is the only
//! caller of these operations; everything here is deterministic and
//! total, so the whole rule set is testable without a runtime.

mod board;
mod dice;
mod ids;
mod rules;
mod state;

pub use board::{
    is_safe, target_of, Color, FINISH_POSITION, FINISH_START, HOME_POSITION,
    HOME_STRETCH_LENGTH, SAFE_CELLS, TOTAL_PATH_LENGTH,
};
pub use dice::{DiceRoller, SequenceDice, ThreadDice};
pub use ids::{GameCode, GameCodeError, UserId, GAME_CODE_MAX_LEN};
pub use rules::{
    movable_pieces, JoinOutcome, LeaveOutcome, MissOutcome, MoveOutcome, RollOutcome,
    StartOutcome, TickOutcome,
};
pub use state::{
    ChatEntry, Game, GameKind, GameStatus, Piece, PieceState, Player, Rules, TurnEvent,
    CHAT_CAPACITY, PITY_ROLL_THRESHOLD, THREE_SIXES,
};
