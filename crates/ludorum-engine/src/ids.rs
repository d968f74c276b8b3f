//! Identity newtypes shared across the whole stack.
//!
//! Wrapping the underlying strings in named types keeps a `UserId` from
//! being passed where a `GameCode` is expected, and gives each a single
//! place for validation and display formatting.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A stable user identifier, as resolved by the identity port.
///
/// `#[serde(transparent)]` makes it serialize as the plain string, so a
/// `UserId("u-42")` appears as `"u-42"` in every snapshot and frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Maximum accepted game-code length.
pub const GAME_CODE_MAX_LEN: usize = 16;

/// An uppercase alphanumeric identifier for one room.
///
/// Codes arrive in the connection URL path and are parsed
/// case-insensitively; the canonical stored form is uppercase, so
/// `/abc123` and `/ABC123` address the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameCode(String);

impl GameCode {
    /// Parses a raw path segment into a canonical game code.
    ///
    /// Accepts 1 to [`GAME_CODE_MAX_LEN`] ASCII alphanumeric characters
    /// in either case; anything else is rejected.
    pub fn parse(raw: &str) -> Result<Self, GameCodeError> {
        if raw.is_empty() || raw.len() > GAME_CODE_MAX_LEN {
            return Err(GameCodeError::InvalidLength(raw.len()));
        }
        for (index, ch) in raw.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(GameCodeError::InvalidCharacter { ch, index });
            }
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Returns the canonical (uppercase) code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for GameCode {
    type Err = GameCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Why a raw path segment failed to parse as a game code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameCodeError {
    /// Empty, or longer than [`GAME_CODE_MAX_LEN`].
    #[error("game code must be 1-{GAME_CODE_MAX_LEN} characters, got {0}")]
    InvalidLength(usize),

    /// A character outside `[A-Za-z0-9]`.
    #[error("invalid character '{ch}' at position {index} in game code")]
    InvalidCharacter { ch: char, index: usize },
}
