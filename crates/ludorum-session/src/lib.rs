//! # ludorum-session
//!
//! Per-connection session state (`Unauthenticated → Authenticated →
//! Closed`) and the identity port that turns bearer tokens into users.
//! The connection handler in the `ludorum` crate drives both.

#![allow(async_fn_in_trait)]

mod error;
mod identity;
mod session;

pub use error::SessionError;
pub use identity::{Identity, UserProfile, AUTH_TIMEOUT};
pub use session::{Inbound, Session, SessionState};
