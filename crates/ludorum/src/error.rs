//! Unified error type for the meta-crate.

use ludorum_protocol::ProtocolError;
use ludorum_room::RoomError;
use ludorum_session::SessionError;
use ludorum_transport::TransportError;

/// Top-level error wrapping the layer-specific errors, so callers of
/// the meta-crate deal with one type and `?` converts automatically.
#[derive(Debug, thiserror::Error)]
pub enum LudorumError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error() {
        let err: LudorumError = SessionError::AuthTimeout.into();
        assert!(matches!(err, LudorumError::Session(_)));
        assert_eq!(err.to_string(), "authentication timed out");
    }

    #[test]
    fn test_from_room_error() {
        let code = ludorum_engine::GameCode::parse("X1").unwrap();
        let err: LudorumError = RoomError::GameOver(code).into();
        assert!(matches!(err, LudorumError::Room(_)));
        assert!(err.to_string().contains("X1"));
    }
}
