//! # ludorum-protocol
//!
//! The message contract between display clients and the server: inbound
//! `{action, payload}` frames, outbound `{type, payload}` frames, the
//! JSON codec, and the WebSocket close codes. Everything game-shaped in
//! the payloads comes from `ludorum-engine`; this crate only says how it
//! looks on the wire.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientAction, RawFrame, ServerFrame, CLOSE_AUTH_FAILURE, CLOSE_SERVER_ERROR,
};
