//! Protocol-level errors.

/// Errors produced while encoding, decoding, or validating frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes were not a valid frame of the expected shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A structurally valid frame that breaks the protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
