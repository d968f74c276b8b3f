//! The wire contract: every JSON object that crosses a room connection.
//!
//! Inbound frames are `{ "action": "...", "payload": { ... } }`; outbound
//! frames are `{ "type": "...", "payload": { ... } }`. The
//! `GAME_STATE_UPDATE` payload is the full [`Game`] snapshot; clients
//! treat it as ground truth and re-render from scratch on every update.
//!
//! Inbound parsing is two-phase on purpose: the envelope is parsed
//! first, then the action tag is matched and its payload decoded. A
//! frame that is not valid JSON is malformed (logged, dropped); a valid
//! envelope with an unrecognized tag becomes [`ClientAction::NoOp`] so
//! unknown actions are silently ignored instead of erroring.

use ludorum_engine::Game;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// WebSocket close code sent after `AUTH_FAILURE`.
pub const CLOSE_AUTH_FAILURE: u16 = 4001;

/// WebSocket close code for server-side failures at connect time
/// (room lookup failure, completed tournament, invalid game code).
pub const CLOSE_SERVER_ERROR: u16 = 1011;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The raw inbound envelope, before the action tag is interpreted.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    pub action: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovePayload {
    piece_id: u8,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    text: String,
}

/// A parsed client action. Unknown tags map to `NoOp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Auth { token: String },
    StartGame,
    RollDice,
    MovePiece { piece_id: u8 },
    LeaveGame,
    SendChatMessage { text: String },
    NoOp,
}

impl ClientAction {
    /// Parses one inbound frame.
    ///
    /// # Errors
    /// `ProtocolError::Decode` when the bytes are not a valid envelope,
    /// or a known action carries an unusable payload. Unknown action
    /// tags are not errors; they parse to [`ClientAction::NoOp`].
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawFrame = serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
        Ok(match raw.action.as_str() {
            "AUTH" => {
                let p: AuthPayload =
                    serde_json::from_value(raw.payload).map_err(ProtocolError::Decode)?;
                Self::Auth { token: p.token }
            }
            "START_GAME" => Self::StartGame,
            "ROLL_DICE" => Self::RollDice,
            "MOVE_PIECE" => {
                let p: MovePayload =
                    serde_json::from_value(raw.payload).map_err(ProtocolError::Decode)?;
                Self::MovePiece { piece_id: p.piece_id }
            }
            "LEAVE_GAME" => Self::LeaveGame,
            "SEND_CHAT_MESSAGE" => {
                let p: ChatPayload =
                    serde_json::from_value(raw.payload).map_err(ProtocolError::Decode)?;
                Self::SendChatMessage { text: p.text }
            }
            _ => Self::NoOp,
        })
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A server-to-client frame, serialized as `{ "type", "payload" }`.
///
/// `AUTH_FAILURE` is always followed by a close with
/// [`CLOSE_AUTH_FAILURE`]; `ERROR` is non-fatal and the connection stays
/// open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerFrame {
    #[serde(rename = "AUTH_SUCCESS")]
    AuthSuccess {},

    #[serde(rename = "AUTH_FAILURE")]
    AuthFailure { message: String },

    #[serde(rename = "GAME_STATE_UPDATE")]
    GameStateUpdate(Box<Game>),

    #[serde(rename = "ERROR")]
    Error { message: String },
}

impl ServerFrame {
    /// Snapshot frame from the current game state.
    pub fn snapshot(game: &Game) -> Self {
        Self::GameStateUpdate(Box::new(game.clone()))
    }

    /// Non-fatal error frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
