//! Authentication hook for the handshake.
//!
//! pairhub doesn't issue or verify credentials itself; account storage
//! and token issuance belong to an external user service. The server
//! only calls an [`Authenticator`] with whatever token the client put in
//! its `Handshake` and remembers the returned [`AccountRef`].

use std::future::Future;

use pairhub_protocol::AccountRef;

use crate::SessionError;

/// Validates a client's handshake token.
///
/// `Ok(None)` admits the connection as a guest. `Err` rejects it and the
/// connection is closed after an `Error {code: 401}`.
///
/// # Example
///
/// ```rust
/// use pairhub_protocol::AccountRef;
/// use pairhub_session::{Authenticator, SessionError};
///
/// /// Requires a token of the form `user:<name>`.
/// struct PrefixAuthenticator;
///
/// impl Authenticator for PrefixAuthenticator {
///     async fn authenticate(
///         &self,
///         token: Option<&str>,
///     ) -> Result<Option<AccountRef>, SessionError> {
///         let name = token
///             .and_then(|t| t.strip_prefix("user:"))
///             .ok_or_else(|| SessionError::AuthFailed("missing user token".into()))?;
///         Ok(Some(AccountRef(name.to_owned())))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(
        &self,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Option<AccountRef>, SessionError>> + Send;
}

/// Admits everyone as a guest and ignores the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticator;

impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(
        &self,
        _token: Option<&str>,
    ) -> Result<Option<AccountRef>, SessionError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_anonymous_admits_with_or_without_token() {
        let auth = AnonymousAuthenticator;
        assert_eq!(auth.authenticate(None).await.unwrap(), None);
        assert_eq!(auth.authenticate(Some("whatever")).await.unwrap(), None);
    }
}
