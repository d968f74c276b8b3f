//! The identity port: token in, user out.
//!
//! The server does not verify credentials itself; deployments plug in
//! whatever their auth provider is (JWT validation, an internal user
//! service, a dev stub) by implementing [`Identity`]. The connection
//! handler calls it once per connection, for the AUTH frame, under
//! [`AUTH_TIMEOUT`].

use std::time::Duration;

use ludorum_engine::UserId;

use crate::SessionError;

/// Bound on a single token resolution. Expiry is an auth failure.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// The resolved identity behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
}

/// Resolves a bearer token to a user.
///
/// # Example
///
/// ```rust
/// use ludorum_session::{Identity, SessionError, UserProfile};
/// use ludorum_engine::UserId;
///
/// /// Accepts tokens of the form `id:name`. Development only.
/// struct DevIdentity;
///
/// impl Identity for DevIdentity {
///     async fn resolve(&self, token: &str) -> Result<UserProfile, SessionError> {
///         let (id, name) = token
///             .split_once(':')
///             .ok_or_else(|| SessionError::AuthFailed("token must be id:name".into()))?;
///         Ok(UserProfile {
///             user_id: UserId::from(id),
///             display_name: name.to_string(),
///         })
///     }
/// }
/// ```
pub trait Identity: Send + Sync + 'static {
    /// Validates `token` and returns who it belongs to.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] for an invalid or expired token.
    fn resolve(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserProfile, SessionError>> + Send;
}
