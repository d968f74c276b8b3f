//! Per-connection session state machine.
//!
//! ```text
//!   Unauthenticated ──(AUTH ok)──► Authenticated ──(socket gone)──► Closed
//!          │                                │
//!          └──(AUTH failed / timeout)───────┴──────────────────────► Closed
//! ```
//!
//! Before authentication the only frame that does anything is AUTH;
//! everything else is ignored, per the "auth first" contract. After
//! authentication, game actions are forwarded to the room actor and a
//! repeated AUTH is ignored.

use ludorum_protocol::ClientAction;

use crate::UserProfile;

/// Where a connection is in its life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no identity yet. Only AUTH is honored.
    Unauthenticated,
    /// Identity resolved; actions flow to the room.
    Authenticated(UserProfile),
    /// The connection is finished; nothing is honored.
    Closed,
}

/// What the connection handler should do with a parsed inbound action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Run the identity port with this token.
    BeginAuth { token: String },
    /// Forward the action to the room actor.
    Forward(ClientAction),
    /// Drop silently.
    Ignore,
}

/// One connection's session.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
}

impl Session {
    /// A fresh, unauthenticated session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The resolved user, once authenticated.
    pub fn user(&self) -> Option<&UserProfile> {
        match &self.state {
            SessionState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    /// Classifies an inbound action against the current state.
    pub fn on_action(&self, action: ClientAction) -> Inbound {
        match (&self.state, action) {
            (SessionState::Unauthenticated, ClientAction::Auth { token }) => {
                Inbound::BeginAuth { token }
            }
            // Auth first: everything else waits.
            (SessionState::Unauthenticated, _) => Inbound::Ignore,
            // A second AUTH on a live session is noise.
            (SessionState::Authenticated(_), ClientAction::Auth { .. }) => Inbound::Ignore,
            (SessionState::Authenticated(_), ClientAction::NoOp) => Inbound::Ignore,
            (SessionState::Authenticated(_), action) => Inbound::Forward(action),
            (SessionState::Closed, _) => Inbound::Ignore,
        }
    }

    /// Marks the session authenticated.
    pub fn authenticated(&mut self, profile: UserProfile) {
        self.state = SessionState::Authenticated(profile);
    }

    /// Marks the session closed. Terminal.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
