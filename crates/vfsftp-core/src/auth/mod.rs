//! Contains the [`Authenticator`] trait, the [`User`] it produces and the credential-table
//! implementation every vfsftp back-end uses.
//!
//! Credentials live in the backing store itself, in a comma separated table with one row per
//! user: `name,secret,admin-flag`, where a flag of `Y` marks an administrator. A back-end exposes
//! that table by implementing [`CredentialSource`]; [`PasswdAuthenticator`] fetches and parses it
//! afresh for every authentication attempt.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use vfsftp_core::auth::{Authenticator, CredentialSource, PasswdAuthenticator};
//! use vfsftp_core::storage::Error;
//!
//! #[derive(Debug)]
//! struct Fixed;
//!
//! #[async_trait]
//! impl CredentialSource for Fixed {
//!     async fn credential_table(&self) -> Result<Vec<u8>, Error> {
//!         Ok(b"alice,secret,N\nroot,toor,Y\n".to_vec())
//!     }
//! }
//!
//! # async fn demo() {
//! let authenticator = PasswdAuthenticator::new(Arc::new(Fixed));
//! let user = authenticator.authenticate("alice", "secret").await.unwrap();
//! assert!(!user.is_admin());
//! # }
//! ```

mod authenticator;
pub use authenticator::{AuthenticationError, Authenticator};

mod passwd;
pub use passwd::{CredentialSource, CredentialTable, PasswdAuthenticator};

mod user;
pub use user::{Role, User};
