//! Game state: the full record the room actor owns and broadcasts.
//!
//! Everything here serializes as camelCase JSON; the serialized `Game` IS
//! the `GAME_STATE_UPDATE` payload, so clients re-render from it on every
//! update and never hold derived state. Field order is fixed by the
//! struct definitions, which keeps snapshots byte-stable across
//! round-trips.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::board::{Color, HOME_POSITION};
use crate::ids::{GameCode, UserId};

/// Chat entries kept in the in-memory ring.
pub const CHAT_CAPACITY: usize = 50;

// ---------------------------------------------------------------------------
// Rules (tunable parameters)
// ---------------------------------------------------------------------------

/// Tunable rule parameters, fixed per game at room creation.
///
/// These never travel in snapshots; clients only see their effects
/// (`turnSecondsLeft`, forfeits, forced sixes).
#[derive(Debug, Clone)]
pub struct Rules {
    /// Seconds a seat gets per turn before the miss counter ticks.
    pub turn_limit_secs: u32,
    /// Missed turns before the seat is forfeited as-if LEAVE.
    pub max_inactive_turns: u8,
    /// Force a six after four all-home rolls without one.
    pub pity_six: bool,
    /// Forfeit the turn on a third consecutive six.
    pub three_sixes_penalty: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            turn_limit_secs: 30,
            max_inactive_turns: 5,
            pity_six: true,
            three_sixes_penalty: true,
        }
    }
}

/// All-home rolls without a six before the pity six kicks in.
pub const PITY_ROLL_THRESHOLD: u8 = 4;

/// Consecutive sixes that forfeit the turn.
pub const THREE_SIXES: u8 = 3;

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// Where a piece is in its life: waiting at Home, on the board, or done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceState {
    Home,
    Active,
    Finished,
}

/// One of a player's four pieces.
///
/// `id` is unique within the game: `color index * 4 + slot`, so Green's
/// pieces are 4..=7 and Yellow's 12..=15.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub id: u8,
    pub state: PieceState,
    pub position: i16,
}

impl Piece {
    /// A fresh piece at Home.
    pub fn home(id: u8) -> Self {
        Self {
            id,
            state: PieceState::Home,
            position: HOME_POSITION,
        }
    }

    /// Sends the piece back to Home (captured).
    pub fn send_home(&mut self) {
        self.state = PieceState::Home;
        self.position = HOME_POSITION;
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One seat at the table. The seat index in `Game::players` fixes the
/// color for the whole game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: UserId,
    pub name: String,
    pub color: Color,
    pub pieces: [Piece; 4],
    pub is_host: bool,
    pub has_finished: bool,
    pub is_removed: bool,
    pub disconnected: bool,
    pub inactive_turns: u8,
    pub consecutive_sixes: u8,
    pub rolls_without_six_when_all_home: u8,
}

impl Player {
    /// Seats a new player on `color` with four Home pieces.
    pub fn new(id: UserId, name: String, color: Color, is_host: bool) -> Self {
        let base = color.index() * 4;
        let pieces = [
            Piece::home(base),
            Piece::home(base + 1),
            Piece::home(base + 2),
            Piece::home(base + 3),
        ];
        Self {
            id,
            name,
            color,
            pieces,
            is_host,
            has_finished: false,
            is_removed: false,
            disconnected: false,
            inactive_turns: 0,
            consecutive_sixes: 0,
            rolls_without_six_when_all_home: 0,
        }
    }

    /// `true` if all four pieces are still at Home.
    pub fn all_home(&self) -> bool {
        self.pieces.iter().all(|p| p.state == PieceState::Home)
    }

    /// `true` if all four pieces have Finished.
    pub fn all_finished(&self) -> bool {
        self.pieces.iter().all(|p| p.state == PieceState::Finished)
    }

    /// `true` while the player still competes: neither finished nor
    /// removed.
    pub fn is_live(&self) -> bool {
        !self.has_finished && !self.is_removed
    }

    /// Looks up one of this player's pieces by id.
    pub fn piece(&self, piece_id: u8) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == piece_id)
    }

    pub(crate) fn piece_mut(&mut self, piece_id: u8) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.id == piece_id)
    }
}

// ---------------------------------------------------------------------------
// Turn log and chat
// ---------------------------------------------------------------------------

/// A structured entry in the append-only turn log. Doubles as the record
/// appended through the persistence port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurnEvent {
    GameStarted {
        order: Vec<Color>,
    },
    Rolled {
        user_id: UserId,
        value: u8,
    },
    Moved {
        user_id: UserId,
        piece_id: u8,
        from: i16,
        to: i16,
        captures: Vec<u8>,
    },
    ThreeSixes {
        user_id: UserId,
    },
    TurnMissed {
        user_id: UserId,
        strikes: u8,
    },
    PlayerLeft {
        user_id: UserId,
    },
    PlayerForfeited {
        user_id: UserId,
    },
    GameFinished {
        winner: Option<UserId>,
    },
}

/// One chat message in the bounded ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub user_id: UserId,
    pub name: String,
    pub text: String,
    pub sent_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// How the room came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Ad-hoc room created by the first connector.
    Manual,
    /// Seeded from an ACTIVE tournament row.
    Tournament,
}

/// Room lifecycle: filling seats, playing, done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Setup,
    Playing,
    Finished,
}

/// The canonical state of one game. Owned exclusively by its room actor;
/// the serialized form is the full client snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub code: GameCode,
    pub kind: GameKind,
    pub max_players: u8,
    pub host_id: Option<UserId>,
    pub tournament_id: Option<String>,
    pub players: Vec<Player>,
    pub current_seat: usize,
    pub player_order: Vec<Color>,
    pub status: GameStatus,
    pub dice: Option<u8>,
    pub is_rolling: bool,
    pub movable: Vec<u8>,
    pub turn_seconds_left: u32,
    pub winner: Option<UserId>,
    pub message: String,
    pub chat: VecDeque<ChatEntry>,
    pub turn_log: Vec<TurnEvent>,

    /// Set between a no-move/three-sixes roll and the delayed seat
    /// advance; blocks new rolls in that window. Never serialized.
    #[serde(skip)]
    pub pending_advance: bool,

    /// Rule parameters for this game. Never serialized.
    #[serde(skip)]
    pub rules: Rules,
}

impl Game {
    /// Creates an empty game in Setup. `max_players` is clamped to the
    /// supported table sizes (2 or 4).
    pub fn new(code: GameCode, kind: GameKind, max_players: u8, rules: Rules) -> Self {
        let max_players = if max_players <= 2 { 2 } else { 4 };
        Self {
            code,
            kind,
            max_players,
            host_id: None,
            tournament_id: None,
            players: Vec::new(),
            current_seat: 0,
            player_order: Vec::new(),
            status: GameStatus::Setup,
            dice: None,
            is_rolling: false,
            movable: Vec::new(),
            turn_seconds_left: rules.turn_limit_secs,
            winner: None,
            message: "Waiting for players".to_string(),
            chat: VecDeque::new(),
            turn_log: Vec::new(),
            pending_advance: false,
            rules,
        }
    }

    /// The player holding the current seat, if any are seated.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_seat)
    }

    /// Looks up a seated player by user id.
    pub fn player(&self, user_id: &UserId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == user_id)
    }

    pub(crate) fn player_mut(&mut self, user_id: &UserId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == user_id)
    }

    /// Seat index of a user, if seated.
    pub fn seat_of(&self, user_id: &UserId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == user_id)
    }

    /// Appends to the chat ring, evicting the oldest entry past
    /// [`CHAT_CAPACITY`].
    pub fn push_chat(&mut self, entry: ChatEntry) {
        if self.chat.len() == CHAT_CAPACITY {
            self.chat.pop_front();
        }
        self.chat.push_back(entry);
    }

    /// Marks a seated player connected or disconnected. Returns `false`
    /// for unknown users.
    pub fn set_disconnected(&mut self, user_id: &UserId, disconnected: bool) -> bool {
        match self.player_mut(user_id) {
            Some(p) => {
                p.disconnected = disconnected;
                true
            }
            None => false,
        }
    }

    /// Piece-count conservation: every seated player always owns exactly
    /// four pieces in some state. Used by tests and debug assertions.
    pub fn piece_census(&self) -> (usize, usize, usize) {
        let mut home = 0;
        let mut active = 0;
        let mut finished = 0;
        for p in &self.players {
            for piece in &p.pieces {
                match piece.state {
                    PieceState::Home => home += 1,
                    PieceState::Active => active += 1,
                    PieceState::Finished => finished += 1,
                }
            }
        }
        (home, active, finished)
    }
}
