//! The service provider interface (SPI) for auth

use super::User;
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

/// Defines the requirements for Authentication implementations
#[async_trait]
pub trait Authenticator: Sync + Send + Debug {
    /// Authenticate the given user with the given password.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthenticationError>;

    /// Implement to set the name of the authenticator. By default it returns the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The error returned by authenticators. The variants are for logging only; a session never
/// tells its client more than that authentication failed.
#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// No user by that name.
    #[error("bad username")]
    BadUser,

    /// The user exists but the secret did not match.
    #[error("bad password")]
    BadPassword,

    /// Another issue occurred during the authentication process, e.g. the credential table
    /// could not be fetched.
    #[error("authentication error: {0}")]
    ImplPropagated(String, #[source] Option<Box<dyn std::error::Error + Send + Sync + 'static>>),
}

impl AuthenticationError {
    /// Creates a new domain specific error with the given source error.
    pub fn with_source<E>(s: impl Into<String>, source: E) -> AuthenticationError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AuthenticationError::ImplPropagated(s.into(), Some(Box::new(source)))
    }
}
