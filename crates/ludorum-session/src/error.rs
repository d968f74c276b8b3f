//! Session-layer errors.

/// Why a session could not be established or used.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The identity port rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The identity port did not answer inside the auth timeout.
    #[error("authentication timed out")]
    AuthTimeout,

    /// An operation that requires authentication ran without it.
    #[error("not authenticated")]
    NotAuthenticated,
}
